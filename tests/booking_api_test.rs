// ==========================================
// BookingApi 异步接口集成测试
// ==========================================
// 覆盖: 并发请求、配置覆盖、错误映射
// ==========================================


#[cfg(test)]
mod booking_api_test {
    use super::test_helpers::*;
    use futures::future::join_all;
    use hospital_scheduler::app::AppState;
    use hospital_scheduler::config::config_keys;
    use hospital_scheduler::domain::{
        AdmissionRequest, AppointmentRequest, IntervalBookingRequest, ReservationStatus, Resource,
        Urgency,
    };
    use hospital_scheduler::engine::{
        BookingError, BookingEventPublisher, BookingEventType, FixedClock,
    };
    use hospital_scheduler::ApiError;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    struct ApiEnv {
        _temp_file: NamedTempFile,
        state: Arc<AppState>,
        events: Arc<RecordingPublisher>,
    }

    fn setup_api() -> ApiEnv {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();
        let events = Arc::new(RecordingPublisher::default());
        let state = AppState::build(
            db_path,
            Arc::new(FixedClock(at(10, 8, 0))),
            Some(events.clone() as Arc<dyn BookingEventPublisher>),
        )
        .unwrap();

        ApiEnv {
            _temp_file: temp_file,
            state: Arc::new(state),
            events,
        }
    }

    fn appointment(requester: String) -> AppointmentRequest {
        AppointmentRequest {
            requester_id: requester,
            requirement_text: "palpitation at night".to_string(),
            preferred_start: None,
            urgency: Urgency::Normal,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocations_get_distinct_slots() {
        let env = setup_api();
        env.state
            .resource_repo
            .insert(&Resource::practitioner("D1", "Dr. A", "Cardiology"))
            .unwrap();
        env.state
            .config_manager
            .set_global_config_value(config_keys::MAX_ALLOCATION_ATTEMPTS, "10")
            .unwrap();

        let tasks = (0..5).map(|i| {
            let state = env.state.clone();
            async move {
                state
                    .booking_api
                    .allocate_and_book_appointment(appointment(format!("P{}", i)))
                    .await
            }
        });
        let results = join_all(tasks).await;

        let starts: HashSet<_> = results
            .iter()
            .map(|r| r.as_ref().unwrap().interval.start)
            .collect();
        assert_eq!(starts.len(), 5);

        let booked = env
            .state
            .booking_api
            .list_reservations_on_day("D1", at(10, 0, 0).date())
            .await
            .unwrap();
        assert_eq!(booked.len(), 5);
        assert!(booked.iter().all(|r| r.status == ReservationStatus::Confirmed));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_interval_bookings_single_winner() {
        let env = setup_api();
        env.state.resource_repo.insert(&Resource::theater("OT-1")).unwrap();

        let tasks = (0..6).map(|i| {
            let state = env.state.clone();
            async move {
                state
                    .booking_api
                    .book_interval(IntervalBookingRequest {
                        actor_id: "or".to_string(),
                        resource_id: "OT-1".to_string(),
                        requester_id: format!("P{}", i),
                        attending_id: None,
                        start: at(11, 10, 0),
                        end: at(11, 11, 0),
                        procedure: None,
                        urgency: Urgency::Normal,
                    })
                    .await
            }
        });
        let results = join_all(tasks).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                err.as_booking(),
                Some(BookingError::ResourceBooked { .. })
            ));
            assert!(!err.is_retryable());
        }
    }

    #[tokio::test]
    async fn test_config_override_is_honored() {
        let env = setup_api();
        env.state
            .resource_repo
            .insert(&Resource::practitioner("D1", "Dr. A", "Cardiology"))
            .unwrap();
        env.state
            .config_manager
            .set_global_config_value(config_keys::SLOT_GRANULARITY_MINUTES, "15")
            .unwrap();
        env.state
            .config_manager
            .set_global_config_value(config_keys::BUSINESS_OPEN, "08:00")
            .unwrap();

        let api = &env.state.booking_api;
        let first = api.allocate_and_book_appointment(appointment("P1".to_string())).await.unwrap();
        let second = api.allocate_and_book_appointment(appointment("P2".to_string())).await.unwrap();

        // 08:00 恰为开诊时刻，前进一格到 08:15
        assert_eq!(first.interval.start, at(10, 8, 15));
        assert_eq!(first.interval.end, at(10, 8, 30));
        assert_eq!(second.interval.start, at(10, 8, 30));
    }

    #[tokio::test]
    async fn test_admission_flow_and_queries() {
        let env = setup_api();
        let repo = &env.state.resource_repo;
        repo.insert(&Resource::practitioner("D1", "Dr. A", "General Physician"))
            .unwrap();
        repo.insert(&Resource::bed("W1-101", "W1", "General", None)).unwrap();

        let api = &env.state.booking_api;
        let admitted = api
            .admit_to_bed(AdmissionRequest {
                actor_id: "nurse".to_string(),
                bed_id: "W1-101".to_string(),
                occupant_id: "P1".to_string(),
                attending_id: "D1".to_string(),
                diagnosis: None,
            })
            .await
            .unwrap();

        assert_eq!(api.list_active_admissions().await.unwrap().len(), 1);
        let fetched = api.get_reservation(&admitted.reservation_id).await.unwrap();
        assert_eq!(fetched.status, ReservationStatus::Admitted);

        let released = api
            .release_reservation(&admitted.reservation_id, "nurse")
            .await
            .unwrap();
        assert_eq!(released.new_status, ReservationStatus::Discharged);
        assert!(api.list_active_admissions().await.unwrap().is_empty());
        assert_eq!(api.list_transitions(&admitted.reservation_id).await.unwrap().len(), 2);

        let kinds: Vec<_> = env.events.events().iter().map(|e| e.event_type).collect();
        assert_eq!(kinds, vec![BookingEventType::Allocated, BookingEventType::StatusChanged]);
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let env = setup_api();
        let api = &env.state.booking_api;

        let err = api.get_reservation("missing").await.unwrap_err();
        assert!(matches!(err.as_booking(), Some(BookingError::NotFound { .. })));

        let err = api.release_reservation("  ", "nurse").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err = api
            .advance_status("missing", ReservationStatus::Confirmed, "nurse")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Booking(BookingError::NotFound { .. })));

        let err = api
            .allocate_and_book_appointment(appointment("P1".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err.as_booking(), Some(BookingError::NoEligibleResource { .. })));
    }
}
