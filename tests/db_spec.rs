use cat_agency::db::Database;
use cat_agency::models::*;
use cat_agency::store::{CatStore, MissionStore, StoreError, TargetStore};
use speculate2::speculate;
use uuid::Uuid;

fn create_test_cat(db: &Database, name: &str) -> Cat {
    db.add_cat(CreateCatInput {
        name: name.to_string(),
        years_experience: 3,
        breed: "Siamese".to_string(),
        salary: 1200,
    })
    .expect("Failed to create cat")
}

fn create_test_mission(db: &Database, count: usize) -> Mission {
    let targets: Vec<NewTarget> = (0..count)
        .map(|i| NewTarget::new(format!("Target {i}"), "France"))
        .collect();
    db.add_mission(&targets).expect("Failed to create mission")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "cats" {
        it "creates and reads back a cat" {
            let cat = create_test_cat(&db, "Whiskers");

            let loaded = db.get_cat(cat.id).expect("Failed to get cat");
            assert_eq!(loaded.name, "Whiskers");
            assert_eq!(loaded.breed, "Siamese");
            assert_eq!(loaded.years_experience, 3);
            assert_eq!(loaded.salary, 1200);
        }

        it "finds a cat by name" {
            let cat = create_test_cat(&db, "Shadow");

            let loaded = db.get_cat_by_name("Shadow").expect("Failed to get cat");
            assert_eq!(loaded.id, cat.id);
        }

        it "rejects a duplicate name as a conflict" {
            create_test_cat(&db, "Tom");

            let result = db.add_cat(CreateCatInput {
                name: "Tom".to_string(),
                years_experience: 1,
                breed: "Bengal".to_string(),
                salary: 10,
            });
            assert!(matches!(result, Err(StoreError::Conflict)));
        }

        it "lists cats ordered by name" {
            create_test_cat(&db, "Zorro");
            create_test_cat(&db, "Alfie");

            let names: Vec<String> = db.list_cats().unwrap().into_iter().map(|c| c.name).collect();
            assert_eq!(names, vec!["Alfie", "Zorro"]);
        }

        it "updates a cat" {
            let mut cat = create_test_cat(&db, "Felix");
            cat.salary = 5000;

            db.update_cat(&cat).expect("Failed to update cat");

            assert_eq!(db.get_cat(cat.id).unwrap().salary, 5000);
        }

        it "reports a missing cat as not found" {
            assert!(matches!(db.get_cat(Uuid::new_v4()), Err(StoreError::NotFound)));
            assert!(matches!(db.delete_cat(Uuid::new_v4()), Err(StoreError::NotFound)));
        }

        it "clears the assignment when a cat is deleted" {
            let cat = create_test_cat(&db, "Garfield");
            let mission = create_test_mission(&db, 1);
            db.update_mission(mission.id, UpdateMissionInput {
                cat_id: Some(Some(cat.id)),
                ..Default::default()
            }).unwrap();

            db.delete_cat(cat.id).expect("Failed to delete cat");

            assert_eq!(db.get_mission(mission.id).unwrap().cat_id, None);
        }
    }

    describe "missions" {
        it "creates a started mission with its targets in order" {
            let mission = db
                .add_mission(&[NewTarget::new("A", "X"), NewTarget::new("B", "Y").with_notes("tall")])
                .expect("Failed to create mission");

            assert_eq!(mission.state, MissionState::Started);
            assert!(mission.cat_id.is_none());

            let targets = db.list_targets(mission.id).unwrap();
            assert_eq!(targets.len(), 2);
            assert_eq!(targets[0].name, "A");
            assert_eq!(targets[0].country, "X");
            assert_eq!(targets[0].notes, "");
            assert_eq!(targets[1].name, "B");
            assert_eq!(targets[1].notes, "tall");
            assert!(targets.iter().all(|t| t.state == TargetState::Started));
        }

        it "completes a mission" {
            let mission = create_test_mission(&db, 1);

            let updated = db.update_mission(mission.id, UpdateMissionInput {
                state: Some(MissionState::Completed),
                ..Default::default()
            }).unwrap();

            assert_eq!(updated.state, MissionState::Completed);
            assert_eq!(db.get_mission(mission.id).unwrap().state, MissionState::Completed);
        }

        it "assigns and clears a cat" {
            let cat = create_test_cat(&db, "Luna");
            let mission = create_test_mission(&db, 1);

            db.update_mission(mission.id, UpdateMissionInput {
                cat_id: Some(Some(cat.id)),
                ..Default::default()
            }).unwrap();
            assert_eq!(db.find_missions_by_cat(cat.id).unwrap().len(), 1);

            db.update_mission(mission.id, UpdateMissionInput {
                cat_id: Some(None),
                ..Default::default()
            }).unwrap();
            assert!(db.find_missions_by_cat(cat.id).unwrap().is_empty());
        }

        it "deletes a mission together with its targets" {
            let mission = create_test_mission(&db, 2);
            let targets = db.list_targets(mission.id).unwrap();

            db.delete_mission(mission.id).expect("Failed to delete mission");

            assert!(matches!(db.get_mission(mission.id), Err(StoreError::NotFound)));
            for target in targets {
                assert!(matches!(db.get_target(target.id), Err(StoreError::NotFound)));
            }
        }

        it "refuses to delete an assigned mission" {
            let cat = create_test_cat(&db, "Tom");
            let mission = create_test_mission(&db, 2);
            db.update_mission(mission.id, UpdateMissionInput {
                cat_id: Some(Some(cat.id)),
                ..Default::default()
            }).unwrap();

            assert!(matches!(db.delete_mission(mission.id), Err(StoreError::Assigned)));
            assert!(db.get_mission(mission.id).is_ok());
            assert_eq!(db.list_targets(mission.id).unwrap().len(), 2);
        }

        it "reports a missing mission as not found" {
            let id = Uuid::new_v4();
            assert!(matches!(db.get_mission(id), Err(StoreError::NotFound)));
            assert!(matches!(db.delete_mission(id), Err(StoreError::NotFound)));
            assert!(matches!(
                db.update_mission(id, UpdateMissionInput::default()),
                Err(StoreError::NotFound)
            ));
        }

        it "lists missions in creation order" {
            let first = create_test_mission(&db, 1);
            let second = create_test_mission(&db, 1);

            let ids: Vec<Uuid> = db.list_missions().unwrap().into_iter().map(|m| m.id).collect();
            assert_eq!(ids, vec![first.id, second.id]);
        }
    }

    describe "targets" {
        it "adds a target below the limit" {
            let mission = create_test_mission(&db, 2);

            let target = db
                .add_target(mission.id, &NewTarget::new("C", "Z"), MISSION_TARGET_LIMIT)
                .expect("Failed to add target");

            assert_eq!(target.mission_id, mission.id);
            assert_eq!(db.list_targets(mission.id).unwrap().len(), 3);
        }

        it "refuses a target beyond the limit" {
            let mission = create_test_mission(&db, 3);

            let result = db.add_target(mission.id, &NewTarget::new("D", "W"), MISSION_TARGET_LIMIT);

            assert!(matches!(result, Err(StoreError::CapacityExceeded(3))));
            assert_eq!(db.list_targets(mission.id).unwrap().len(), 3);
        }

        it "refuses a target for a completed mission" {
            let mission = create_test_mission(&db, 1);
            db.update_mission(mission.id, UpdateMissionInput {
                state: Some(MissionState::Completed),
                ..Default::default()
            }).unwrap();

            let result = db.add_target(mission.id, &NewTarget::new("B", "Y"), MISSION_TARGET_LIMIT);

            assert!(matches!(result, Err(StoreError::Closed)));
            assert_eq!(db.list_targets(mission.id).unwrap().len(), 1);
        }

        it "reports a full completed mission as over capacity" {
            let mission = create_test_mission(&db, 3);
            db.update_mission(mission.id, UpdateMissionInput {
                state: Some(MissionState::Completed),
                ..Default::default()
            }).unwrap();

            let result = db.add_target(mission.id, &NewTarget::new("D", "W"), MISSION_TARGET_LIMIT);

            assert!(matches!(result, Err(StoreError::CapacityExceeded(3))));
        }

        it "refuses a target for an unknown mission" {
            let result = db.add_target(Uuid::new_v4(), &NewTarget::new("D", "W"), MISSION_TARGET_LIMIT);
            assert!(matches!(result, Err(StoreError::NotFound)));
        }

        it "updates notes and state independently" {
            let mission = create_test_mission(&db, 1);
            let target = db.list_targets(mission.id).unwrap().remove(0);

            db.update_target(target.id, UpdateTargetInput {
                notes: Some("spotted at the docks".to_string()),
                ..Default::default()
            }).unwrap();
            let updated = db.update_target(target.id, UpdateTargetInput {
                state: Some(TargetState::Completed),
                ..Default::default()
            }).unwrap();

            assert_eq!(updated.notes, "spotted at the docks");
            assert_eq!(updated.state, TargetState::Completed);
            assert_eq!(db.get_target(target.id).unwrap(), updated);
        }

        it "deletes a target" {
            let mission = create_test_mission(&db, 2);
            let target = db.list_targets(mission.id).unwrap().remove(0);

            db.delete_target(target.id).expect("Failed to delete target");

            assert_eq!(db.list_targets(mission.id).unwrap().len(), 1);
            assert!(matches!(db.delete_target(target.id), Err(StoreError::NotFound)));
        }
    }

    describe "file backed database" {
        it "keeps records across reopen" {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("agency.db");

            let mission_id = {
                let file_db = Database::open(path.clone()).expect("Failed to open database");
                file_db.migrate().unwrap();
                create_test_mission(&file_db, 2).id
            };

            let reopened = Database::open(path).expect("Failed to reopen database");
            reopened.migrate().expect("Migrations should be idempotent");
            assert_eq!(reopened.list_targets(mission_id).unwrap().len(), 2);
        }
    }
}
