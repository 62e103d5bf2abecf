mod common;

use common::{apply, date, employee, in_memory_service, manager};
use leave_management::auth::auth::AuthUser;
use leave_management::error::LeaveError;
use leave_management::model::leave_request::{LeaveQuery, LeaveStatus};
use leave_management::repository::InMemoryStore;
use leave_management::service::LeaveService;
use rstest::{fixture, rstest};

type BeforeEachReturn = (InMemoryStore, LeaveService, AuthUser, AuthUser);

#[fixture]
fn before_each() -> BeforeEachReturn {
    let (store, service) = in_memory_service();
    (store, service, employee(1, "erin"), manager(2, "mona"))
}

#[rstest]
#[tokio::test]
async fn full_lifecycle_of_two_overlapping_requests(before_each: BeforeEachReturn) {
    let (_store, service, erin, mona) = before_each;

    let first = service
        .apply_leave(&erin, apply(date(2024, 6, 1), date(2024, 6, 5)))
        .await
        .expect("first apply failed");
    assert_eq!(first.leave.status, LeaveStatus::Pending);
    assert_eq!(
        first.employee.as_ref().map(|e| e.email.as_str()),
        Some("erin@corp.test")
    );

    let overlapping = service
        .apply_leave(&erin, apply(date(2024, 6, 3), date(2024, 6, 10)))
        .await;
    assert!(matches!(overlapping, Err(LeaveError::OverlappingRequest)));

    let rejected = service
        .reject_leave(first.leave.id, &mona, "scheduling conflict")
        .await
        .expect("reject failed");
    assert_eq!(rejected.leave.status, LeaveStatus::Rejected);
    assert_eq!(
        rejected.leave.rejection_reason.as_deref(),
        Some("scheduling conflict")
    );

    let second = service
        .apply_leave(&erin, apply(date(2024, 6, 3), date(2024, 6, 10)))
        .await
        .expect("re-apply after rejection failed");

    let approved = service
        .approve_leave(second.leave.id, &mona)
        .await
        .expect("approve failed");
    let mona_employee = approved.approver.clone().expect("approver attached");
    assert_eq!(approved.leave.status, LeaveStatus::Approved);
    assert_eq!(approved.leave.approved_by, Some(mona_employee.id));
    assert_eq!(mona_employee.email, "mona@corp.test");
    assert!(approved.leave.approved_date.is_some());
    assert!(approved.leave.rejection_reason.is_none());

    let again = service
        .approve_leave(second.leave.id, &mona)
        .await
        .unwrap_err();
    assert!(matches!(
        again,
        LeaveError::InvalidStateTransition {
            current: LeaveStatus::Approved,
            ..
        }
    ));
    assert!(again.to_string().contains("Approved"));
}

#[rstest]
#[case::equal_dates(date(2024, 6, 5), date(2024, 6, 5))]
#[case::reversed_dates(date(2024, 6, 10), date(2024, 6, 5))]
#[tokio::test]
async fn invalid_range_creates_nothing(
    before_each: BeforeEachReturn,
    #[case] start: chrono::NaiveDate,
    #[case] end: chrono::NaiveDate,
) {
    let (_store, service, erin, _mona) = before_each;

    let result = service.apply_leave(&erin, apply(start, end)).await;

    assert!(matches!(result, Err(LeaveError::InvalidRange)));
    assert!(service.get_my_leaves(&erin).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn adjacent_ranges_do_not_overlap(before_each: BeforeEachReturn) {
    let (_store, service, erin, _mona) = before_each;

    service
        .apply_leave(&erin, apply(date(2024, 6, 1), date(2024, 6, 5)))
        .await
        .unwrap();
    service
        .apply_leave(&erin, apply(date(2024, 6, 5), date(2024, 6, 8)))
        .await
        .expect("end date is exclusive");
}

#[rstest]
#[tokio::test]
async fn approved_request_still_blocks_the_calendar(before_each: BeforeEachReturn) {
    let (_store, service, erin, mona) = before_each;

    let leave = service
        .apply_leave(&erin, apply(date(2024, 7, 1), date(2024, 7, 3)))
        .await
        .unwrap();
    service.approve_leave(leave.leave.id, &mona).await.unwrap();

    let result = service
        .apply_leave(&erin, apply(date(2024, 7, 2), date(2024, 7, 4)))
        .await;
    assert!(matches!(result, Err(LeaveError::OverlappingRequest)));
}

#[rstest]
#[tokio::test]
async fn other_employees_do_not_conflict(before_each: BeforeEachReturn) {
    let (_store, service, erin, _mona) = before_each;
    let frank = employee(3, "frank");

    service
        .apply_leave(&erin, apply(date(2024, 6, 1), date(2024, 6, 5)))
        .await
        .unwrap();
    service
        .apply_leave(&frank, apply(date(2024, 6, 1), date(2024, 6, 5)))
        .await
        .expect("different employee, same range");
}

#[rstest]
#[tokio::test]
async fn rejected_request_cannot_be_decided_again(before_each: BeforeEachReturn) {
    let (_store, service, erin, mona) = before_each;

    let leave = service
        .apply_leave(&erin, apply(date(2024, 6, 1), date(2024, 6, 5)))
        .await
        .unwrap();
    service
        .reject_leave(leave.leave.id, &mona, "team offsite")
        .await
        .unwrap();

    let approve = service.approve_leave(leave.leave.id, &mona).await.unwrap_err();
    assert_eq!(
        approve.to_string(),
        "Cannot approve leave that is already Rejected"
    );
    let reject = service
        .reject_leave(leave.leave.id, &mona, "again")
        .await
        .unwrap_err();
    assert!(matches!(
        reject,
        LeaveError::InvalidStateTransition {
            current: LeaveStatus::Rejected,
            ..
        }
    ));
}

#[rstest]
#[tokio::test]
async fn owner_can_never_decide_own_request(before_each: BeforeEachReturn) {
    let (_store, service, _erin, mona) = before_each;

    let own = service
        .apply_leave(&mona, apply(date(2024, 8, 1), date(2024, 8, 2)))
        .await
        .unwrap();

    let approve = service.approve_leave(own.leave.id, &mona).await;
    assert!(matches!(approve, Err(LeaveError::SelfActionForbidden { .. })));

    // checked before the reason
    let reject = service.reject_leave(own.leave.id, &mona, "  ").await;
    assert!(matches!(reject, Err(LeaveError::SelfActionForbidden { .. })));

    let unchanged = service.get_leave(own.leave.id, &mona).await.unwrap();
    assert_eq!(unchanged.leave.status, LeaveStatus::Pending);
}

#[rstest]
#[case::empty("")]
#[case::whitespace("   ")]
#[tokio::test]
async fn rejection_requires_a_reason(before_each: BeforeEachReturn, #[case] reason: &str) {
    let (_store, service, erin, mona) = before_each;

    let leave = service
        .apply_leave(&erin, apply(date(2024, 6, 1), date(2024, 6, 5)))
        .await
        .unwrap();

    let result = service.reject_leave(leave.leave.id, &mona, reason).await;
    assert!(matches!(result, Err(LeaveError::ValidationFailed(_))));

    let unchanged = service.get_leave(leave.leave.id, &mona).await.unwrap();
    assert_eq!(unchanged.leave.status, LeaveStatus::Pending);
    assert!(unchanged.leave.rejection_reason.is_none());
}

#[rstest]
#[tokio::test]
async fn deciding_unknown_leave_is_not_found(before_each: BeforeEachReturn) {
    let (_store, service, _erin, mona) = before_each;

    assert!(matches!(
        service.approve_leave(404, &mona).await,
        Err(LeaveError::NotFound)
    ));
    assert!(matches!(
        service.reject_leave(404, &mona, "nope").await,
        Err(LeaveError::NotFound)
    ));
}

#[rstest]
#[tokio::test]
async fn my_leaves_are_newest_first_and_pending_queue_by_start(before_each: BeforeEachReturn) {
    let (_store, service, erin, mona) = before_each;
    let frank = employee(3, "frank");

    let late = service
        .apply_leave(&erin, apply(date(2024, 9, 10), date(2024, 9, 12)))
        .await
        .unwrap();
    let early = service
        .apply_leave(&erin, apply(date(2024, 9, 1), date(2024, 9, 3)))
        .await
        .unwrap();
    let franks = service
        .apply_leave(&frank, apply(date(2024, 9, 5), date(2024, 9, 6)))
        .await
        .unwrap();
    service
        .reject_leave(franks.leave.id, &mona, "coverage")
        .await
        .unwrap();

    let mine: Vec<u64> = service
        .get_my_leaves(&erin)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.leave.id)
        .collect();
    assert_eq!(mine, vec![early.leave.id, late.leave.id]);

    let pending: Vec<u64> = service
        .get_pending_leaves()
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.leave.id)
        .collect();
    assert_eq!(pending, vec![early.leave.id, late.leave.id]);
}

#[rstest]
#[tokio::test]
async fn principal_without_email_has_no_leaves(before_each: BeforeEachReturn) {
    let (_store, service, _erin, _mona) = before_each;
    let anonymous = AuthUser {
        email: "  ".to_string(),
        ..employee(9, "ghost")
    };

    assert!(service.get_my_leaves(&anonymous).await.unwrap().is_empty());
    assert!(matches!(
        service
            .apply_leave(&anonymous, apply(date(2024, 6, 1), date(2024, 6, 2)))
            .await,
        Err(LeaveError::EmployeeNotFound)
    ));
}

#[rstest]
#[tokio::test]
async fn only_owner_or_manager_reads_a_request(before_each: BeforeEachReturn) {
    let (_store, service, erin, mona) = before_each;
    let frank = employee(3, "frank");

    let leave = service
        .apply_leave(&erin, apply(date(2024, 6, 1), date(2024, 6, 5)))
        .await
        .unwrap();

    assert!(service.get_leave(leave.leave.id, &erin).await.is_ok());
    assert!(service.get_leave(leave.leave.id, &mona).await.is_ok());
    assert!(matches!(
        service.get_leave(leave.leave.id, &frank).await,
        Err(LeaveError::AccessDenied)
    ));
    assert!(matches!(
        service.get_leave(999, &mona).await,
        Err(LeaveError::NotFound)
    ));
}

#[rstest]
#[tokio::test]
async fn listing_filters_and_paginates(before_each: BeforeEachReturn) {
    let (_store, service, erin, mona) = before_each;

    for day in [1, 3, 5, 7, 9] {
        service
            .apply_leave(&erin, apply(date(2024, 10, day), date(2024, 10, day + 1)))
            .await
            .unwrap();
    }
    let first = service.get_my_leaves(&erin).await.unwrap().pop().unwrap();
    service.approve_leave(first.leave.id, &mona).await.unwrap();

    let page = service
        .list_leaves(&LeaveQuery::default(), Some(2), Some(2))
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.page, 2);
    assert_eq!(page.data.len(), 2);

    let approved = service
        .list_leaves(
            &LeaveQuery {
                employee_id: first.employee.as_ref().map(|e| e.id),
                status: Some(LeaveStatus::Approved),
            },
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(approved.total, 1);
    assert_eq!(approved.data[0].leave.id, first.leave.id);

    let clamped = service
        .list_leaves(&LeaveQuery::default(), Some(0), Some(10_000))
        .await
        .unwrap();
    assert_eq!(clamped.page, 1);
    assert_eq!(clamped.per_page, 100);
}

#[rstest]
#[tokio::test]
async fn deleting_frees_the_interval(before_each: BeforeEachReturn) {
    let (_store, service, erin, _mona) = before_each;

    let leave = service
        .apply_leave(&erin, apply(date(2024, 6, 1), date(2024, 6, 5)))
        .await
        .unwrap();

    service.delete_leave(leave.leave.id).await.unwrap();
    assert!(matches!(
        service.delete_leave(leave.leave.id).await,
        Err(LeaveError::NotFound)
    ));

    service
        .apply_leave(&erin, apply(date(2024, 6, 1), date(2024, 6, 5)))
        .await
        .expect("interval is free again");
}

#[rstest]
#[tokio::test]
async fn storage_outage_surfaces_as_storage_error(before_each: BeforeEachReturn) {
    let (store, service, erin, _mona) = before_each;
    store.set_offline(true);

    let result = service
        .apply_leave(&erin, apply(date(2024, 6, 1), date(2024, 6, 5)))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, LeaveError::Storage(_)));
    assert_eq!(err.to_string(), "Something went wrong, Contact with system admin");
}
