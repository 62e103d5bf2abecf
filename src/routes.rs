use crate::{
    api::{employee, leave_request},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

// A limit of N per minute refills one token every 60_000 / N ms with a burst of N.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);

    // finish() only fails on a zero period or burst, both excluded above
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

/// Public auth routes.
pub fn configure_auth(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(build_limiter(config.rate_register_per_min))
                    .route(web::post().to(handlers::register)),
            ),
    );
}

/// Bearer-protected API under `config.api_prefix`.
pub fn configure_api(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(build_limiter(config.rate_protected_per_min)) // rate limiting
            .service(web::resource("/employees/me").route(web::get().to(employee::me)))
            .service(
                web::scope("/leaves")
                    // /leaves
                    .service(web::resource("").route(web::get().to(leave_request::leave_list)))
                    .service(
                        web::resource("/apply").route(web::post().to(leave_request::apply_leave)),
                    )
                    // static segments before /{id}
                    .service(web::resource("/my").route(web::get().to(leave_request::my_leaves)))
                    .service(
                        web::resource("/my-leaves").route(web::get().to(leave_request::my_leaves)),
                    )
                    .service(
                        web::resource("/pending")
                            .route(web::get().to(leave_request::pending_leaves)),
                    )
                    // /leaves/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_request::get_leave))
                            .route(web::delete().to(leave_request::delete_leave)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            ),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    configure_auth(cfg, config);
    configure_api(cfg, config);
}
