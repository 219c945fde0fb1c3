// ==========================================
// 床位入院/出院集成测试
// ==========================================


#[cfg(test)]
mod bed_admission_test {
    use super::test_helpers::*;
    use hospital_scheduler::domain::{
        AdmissionRequest, OccupancyStatus, Reservation, ReservationStatus, WardSpec,
    };
    use hospital_scheduler::engine::{BookingError, BookingResult};
    use hospital_scheduler::repository::ResourceDirectory;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn admission(bed: &str, occupant: &str) -> AdmissionRequest {
        AdmissionRequest {
            actor_id: "nurse-1".to_string(),
            bed_id: bed.to_string(),
            occupant_id: occupant.to_string(),
            attending_id: "D1".to_string(),
            diagnosis: Some("Observation".to_string()),
        }
    }

    fn setup_ward() -> TestEnv {
        let env = setup_env(at(10, 14, 0));
        add_doctor(&env, "D1", "Dr. A", "General Physician");
        add_bed(&env, "W1-101", "W1");
        add_bed(&env, "W1-102", "W1");
        env
    }

    fn occupancy(env: &TestEnv, bed: &str) -> Option<OccupancyStatus> {
        env.resources.find_by_id(bed).unwrap().unwrap().occupancy
    }

    #[test]
    fn test_admit_marks_bed_occupied_and_blocks_second_admission() {
        let env = setup_ward();
        let config = default_config();

        let admitted = env.engine.admit_to_bed(&config, &admission("W1-101", "P1")).unwrap();
        assert_eq!(admitted.status, ReservationStatus::Admitted);
        assert_eq!(admitted.start_ts, at(10, 14, 0));
        assert!(admitted.end_ts.is_none());
        assert_eq!(occupancy(&env, "W1-101"), Some(OccupancyStatus::Occupied));

        let err = env.engine.admit_to_bed(&config, &admission("W1-101", "P2")).unwrap_err();
        assert!(matches!(err, BookingError::BedUnavailable { ref bed_id } if bed_id == "W1-101"));

        // 相邻床位不受影响
        env.engine.admit_to_bed(&config, &admission("W1-102", "P2")).unwrap();

        let active = env.reservations.find_active_admissions().unwrap();
        assert_eq!(active.len(), 2);
    }

    #[test]
    fn test_discharge_frees_bed() {
        let env = setup_ward();
        let config = default_config();

        let admitted = env.engine.admit_to_bed(&config, &admission("W1-101", "P1")).unwrap();
        let released = env
            .engine
            .release_reservation(&admitted.reservation_id, "nurse-2")
            .unwrap();
        assert_eq!(released.new_status, ReservationStatus::Discharged);
        assert_eq!(occupancy(&env, "W1-101"), Some(OccupancyStatus::Available));

        let stored = env.reservations.find_by_id(&admitted.reservation_id).unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Discharged);
        assert_eq!(stored.closed_at, Some(at(10, 14, 0)));
        assert!(env.reservations.find_active_admissions().unwrap().is_empty());

        // 出院后可再次入院
        env.engine.admit_to_bed(&config, &admission("W1-101", "P3")).unwrap();
        assert_eq!(occupancy(&env, "W1-101"), Some(OccupancyStatus::Occupied));
    }

    #[test]
    fn test_terminal_and_invalid_transitions() {
        let env = setup_ward();
        let admitted = env
            .engine
            .admit_to_bed(&default_config(), &admission("W1-101", "P1"))
            .unwrap();

        // 在院不能直接取消
        let err = env
            .engine
            .advance_status(&admitted.reservation_id, ReservationStatus::Cancelled, "nurse")
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidTransition {
                from: ReservationStatus::Admitted,
                to: ReservationStatus::Cancelled
            }
        ));
        assert_eq!(occupancy(&env, "W1-101"), Some(OccupancyStatus::Occupied));

        env.engine
            .advance_status(&admitted.reservation_id, ReservationStatus::Discharged, "nurse")
            .unwrap();
        assert_eq!(occupancy(&env, "W1-101"), Some(OccupancyStatus::Available));

        let err = env
            .engine
            .release_reservation(&admitted.reservation_id, "nurse")
            .unwrap_err();
        assert!(matches!(err, BookingError::AlreadyTerminal { .. }));

        let err = env.engine.release_reservation("missing-id", "nurse").unwrap_err();
        assert!(matches!(err, BookingError::NotFound { .. }));

        let history = env.reservations.find_transitions(&admitted.reservation_id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].actor, "nurse");
    }

    #[test]
    fn test_admission_validation() {
        let env = setup_ward();
        let config = default_config();

        // 主治必须是医生
        let mut req = admission("W1-101", "P1");
        req.attending_id = "W1-102".to_string();
        assert!(matches!(
            env.engine.admit_to_bed(&config, &req).unwrap_err(),
            BookingError::InvalidInput(_)
        ));

        // 医生不是床位
        assert!(matches!(
            env.engine.admit_to_bed(&config, &admission("D1", "P1")).unwrap_err(),
            BookingError::InvalidInput(_)
        ));

        assert!(matches!(
            env.engine.admit_to_bed(&config, &admission("W9-999", "P1")).unwrap_err(),
            BookingError::NotFound { .. }
        ));

        // 停用床位不可入院
        env.resources.set_active("W1-102", false).unwrap();
        assert!(matches!(
            env.engine.admit_to_bed(&config, &admission("W1-102", "P1")).unwrap_err(),
            BookingError::BedUnavailable { .. }
        ));

        assert!(env.reservations.find_active_admissions().unwrap().is_empty());
        assert_eq!(occupancy(&env, "W1-101"), Some(OccupancyStatus::Available));
    }

    #[test]
    fn test_created_ward_beds_are_admittable() {
        let env = setup_env(at(10, 9, 0));
        add_doctor(&env, "D1", "Dr. A", "General Physician");
        let beds = env
            .resources
            .create_ward(&WardSpec {
                name: "Maternity".to_string(),
                ward_type: "Maternity".to_string(),
                floor: 3,
                capacity: 2,
                gender: Some("F".to_string()),
            })
            .unwrap();
        let numbers: Vec<_> = beds.iter().map(|b| b.display_name.as_str()).collect();
        assert_eq!(numbers, vec!["MAT-101", "MAT-102"]);

        let admitted = env
            .engine
            .admit_to_bed(&default_config(), &admission(&beds[1].resource_id, "P7"))
            .unwrap();
        assert_eq!(admitted.resource_id, beds[1].resource_id);
        assert_eq!(occupancy(&env, &beds[1].resource_id), Some(OccupancyStatus::Occupied));
        assert_eq!(occupancy(&env, &beds[0].resource_id), Some(OccupancyStatus::Available));
        assert_eq!(env.resources.find_beds_by_ward("Maternity").unwrap().len(), 2);
    }

    #[test]
    fn test_same_prefix_wards_admit_independently() {
        let env = setup_env(at(10, 9, 0));
        add_doctor(&env, "D1", "Dr. A", "General Physician");
        let ward = |name: &str| WardSpec {
            name: name.to_string(),
            ward_type: "General".to_string(),
            floor: 1,
            capacity: 1,
            gender: None,
        };
        let male = env.resources.create_ward(&ward("General Male")).unwrap();
        let female = env.resources.create_ward(&ward("General Female")).unwrap();
        assert_eq!(male[0].display_name, female[0].display_name);

        env.engine
            .admit_to_bed(&default_config(), &admission(&male[0].resource_id, "P1"))
            .unwrap();
        env.engine
            .admit_to_bed(&default_config(), &admission(&female[0].resource_id, "P2"))
            .unwrap();
        assert_eq!(env.reservations.find_active_admissions().unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_admissions_single_winner() {
        let env = setup_ward();
        let workers = 6;
        let barrier = Arc::new(Barrier::new(workers));

        let handles: Vec<_> = (0..workers)
            .map(|i| {
                let engine = env.engine.clone();
                let barrier = barrier.clone();
                thread::spawn(move || -> BookingResult<Reservation> {
                    barrier.wait();
                    engine.admit_to_bed(&default_config(), &admission("W1-101", &format!("P{}", i)))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, BookingError::BedUnavailable { .. })));

        assert_eq!(env.reservations.find_active_admissions().unwrap().len(), 1);
        assert_eq!(occupancy(&env, "W1-101"), Some(OccupancyStatus::Occupied));
    }
}
