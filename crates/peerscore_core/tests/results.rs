use peerscore_core::credentials::PasswordDigest;
use peerscore_core::db::open_db_in_memory;
use peerscore_core::service::seed::seed_defaults;
use peerscore_core::service::transfer::{
    export_bundle, import_bundle, read_bundle, write_bundle, Bundle, ScoreRow, UserRow,
};
use peerscore_core::{
    AccountService, Group, GroupRepository, Individual, IndividualRepository, RatingRepository,
    ResultsService, Role, RoleInference, RoleSet, ScoringConfig, SqliteGroupRepository,
    SqliteIndividualRepository, SqliteRatingRepository,
};
use rusqlite::Connection;

fn results(
    conn: &Connection,
    config: ScoringConfig,
) -> ResultsService<SqliteIndividualRepository<'_>, SqliteRatingRepository<'_>> {
    ResultsService::new(
        SqliteIndividualRepository::new(conn),
        SqliteRatingRepository::new(conn),
        config,
    )
}

fn add_student(conn: &Connection, username: &str, group: &str) {
    SqliteIndividualRepository::new(conn)
        .create_individual(
            &Individual::new(username, username, group, RoleSet::new().with(Role::Student)),
            &PasswordDigest::derive("1234"),
        )
        .unwrap();
}

#[test]
fn compute_matches_two_member_group_example() {
    let conn = open_db_in_memory().unwrap();
    SqliteGroupRepository::new(&conn)
        .create_group(&Group::new("G1"))
        .unwrap();
    add_student(&conn, "s1", "G1");
    add_student(&conn, "s2", "G1");
    let ratings = SqliteRatingRepository::new(&conn);
    ratings.upsert_rating("teacher1", "s1", 15.0).unwrap();
    ratings.upsert_rating("student2", "s1", 10.0).unwrap();

    let report = results(&conn, ScoringConfig::default()).compute().unwrap();

    let s1 = report.individual("s1").unwrap();
    assert_eq!(s1.teacher_component, Some(10.0));
    assert_eq!(s1.student_component, Some(10.0));
    assert_eq!(s1.personal_score, 10.0);
    assert_eq!(s1.final_score, 7.5);

    let s2 = report.individual("s2").unwrap();
    assert_eq!(s2.personal_score, 0.0);
    assert_eq!(s2.final_score, 2.5);

    assert_eq!(report.group_score("G1"), 5.0);
}

#[test]
fn compute_over_seeded_data_scores_whole_groups() {
    let conn = open_db_in_memory().unwrap();
    seed_defaults(
        &SqliteIndividualRepository::new(&conn),
        &SqliteGroupRepository::new(&conn),
        "1234",
    )
    .unwrap();
    let ratings = SqliteRatingRepository::new(&conn);
    ratings.upsert_rating("teacher1", "student1", 9.0).unwrap();
    ratings.upsert_rating("student6", "student1", 8.0).unwrap();

    let report = results(&conn, ScoringConfig::default()).compute().unwrap();

    assert_eq!(report.individuals.len(), 17);
    let student1 = report.individual("student1").unwrap();
    assert_eq!(student1.personal_score, 7.0);
    assert!((report.group_score("Group 1") - 1.4).abs() < 1e-9);
    assert!((student1.final_score - 4.2).abs() < 1e-9);
    assert_eq!(report.group_score("Group 2"), 0.0);
    assert!(report.groups.iter().any(|group| group.group == "Undefined"));
}

#[test]
fn declared_roles_ignore_rater_names() {
    let conn = open_db_in_memory().unwrap();
    add_student(&conn, "alice", "G1");
    add_student(&conn, "bob", "G2");
    SqliteIndividualRepository::new(&conn)
        .create_individual(
            &Individual::ungrouped("prof", "Prof", RoleSet::new().with(Role::Teacher)),
            &PasswordDigest::derive("1234"),
        )
        .unwrap();
    let ratings = SqliteRatingRepository::new(&conn);
    ratings.upsert_rating("prof", "alice", 15.0).unwrap();
    ratings.upsert_rating("bob", "alice", 6.0).unwrap();

    let by_name = results(&conn, ScoringConfig::default()).compute().unwrap();
    assert_eq!(by_name.individual("alice").unwrap().personal_score, 0.0);

    let config = ScoringConfig {
        role_inference: RoleInference::DeclaredRoles,
        ..ScoringConfig::default()
    };
    let by_role = results(&conn, config).compute().unwrap();
    assert_eq!(by_role.individual("alice").unwrap().personal_score, 8.0);
}

#[test]
fn compute_is_deterministic() {
    let conn = open_db_in_memory().unwrap();
    add_student(&conn, "s1", "G1");
    add_student(&conn, "s2", "G2");
    let ratings = SqliteRatingRepository::new(&conn);
    ratings.upsert_rating("teacher1", "s1", 12.0).unwrap();
    ratings.upsert_rating("student9", "s2", 7.0).unwrap();

    let service = results(&conn, ScoringConfig::default());
    let first = serde_json::to_string(&service.compute().unwrap()).unwrap();
    let second = serde_json::to_string(&service.compute().unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn seeding_twice_creates_nothing_new() {
    let conn = open_db_in_memory().unwrap();
    let individuals = SqliteIndividualRepository::new(&conn);
    let groups = SqliteGroupRepository::new(&conn);

    let first = seed_defaults(&individuals, &groups, "1234").unwrap();
    assert_eq!(first.groups_created, 3);
    assert_eq!(first.individuals_created, 17);

    let second = seed_defaults(&individuals, &groups, "1234").unwrap();
    assert_eq!(second.groups_created, 0);
    assert_eq!(second.individuals_created, 0);

    let accounts = AccountService::new(individuals, groups);
    assert!(accounts.authenticate("student15", "1234").is_ok());
    assert_eq!(
        accounts.get_individual("student6").unwrap().unwrap().group,
        "Group 2"
    );
}

#[test]
fn export_then_import_reproduces_report_without_passwords() {
    let source = open_db_in_memory().unwrap();
    seed_defaults(
        &SqliteIndividualRepository::new(&source),
        &SqliteGroupRepository::new(&source),
        "secret",
    )
    .unwrap();
    let ratings = SqliteRatingRepository::new(&source);
    ratings.upsert_rating("teacher1", "student3", 13.5).unwrap();
    ratings.upsert_rating("student8", "student3", 9.0).unwrap();
    ratings.upsert_rating("student2", "student12", 6.0).unwrap();

    let bundle = export_bundle(&source).unwrap();
    assert!(bundle.users.iter().all(|row| row.password.is_none()));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.json");
    write_bundle(&path, &bundle).unwrap();
    assert!(!std::fs::read_to_string(&path).unwrap().contains("password"));
    let loaded = read_bundle(&path).unwrap();
    assert_eq!(loaded, bundle);

    let target = open_db_in_memory().unwrap();
    let summary = import_bundle(&target, &loaded, "fresh").unwrap();
    assert_eq!(summary.groups_created, 3);
    assert_eq!(summary.users_created, 17);
    assert_eq!(summary.scores_saved, 3);

    let expected = results(&source, ScoringConfig::default()).compute().unwrap();
    let actual = results(&target, ScoringConfig::default()).compute().unwrap();
    assert_eq!(actual, expected);

    let accounts = AccountService::new(
        SqliteIndividualRepository::new(&target),
        SqliteGroupRepository::new(&target),
    );
    assert!(accounts.authenticate("student3", "fresh").is_ok());
}

#[test]
fn import_skips_existing_users_and_registers_missing_groups() {
    let conn = open_db_in_memory().unwrap();
    add_student(&conn, "alice", "G1");
    let bundle = Bundle {
        groups: Vec::new(),
        users: vec![
            UserRow {
                username: "alice".to_string(),
                realname: "Alice Again".to_string(),
                roles: "Student".to_string(),
                group: "G9".to_string(),
                password: None,
            },
            UserRow {
                username: "bob".to_string(),
                realname: "Bob".to_string(),
                roles: "Student".to_string(),
                group: "G2".to_string(),
                password: Some("bobpw".to_string()),
            },
        ],
        scores: vec![ScoreRow {
            rater: "bob".to_string(),
            target: "alice".to_string(),
            score: 7.0,
            timestamp: None,
        }],
    };

    let summary = import_bundle(&conn, &bundle, "1234").unwrap();
    assert_eq!(summary.users_created, 1);
    assert_eq!(summary.users_skipped, 1);
    assert_eq!(summary.groups_created, 2);

    let individuals = SqliteIndividualRepository::new(&conn);
    assert_eq!(
        individuals.get_individual("alice").unwrap().unwrap().group,
        "G1"
    );
    assert!(individuals
        .get_credentials("bob")
        .unwrap()
        .unwrap()
        .digest
        .verify("bobpw"));
    assert_eq!(
        SqliteRatingRepository::new(&conn)
            .list_ratings_for_target("alice")
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn failed_import_rolls_back_everything() {
    let conn = open_db_in_memory().unwrap();
    let bundle = Bundle {
        groups: vec!["G1".to_string()],
        users: vec![UserRow {
            username: "carol".to_string(),
            realname: "Carol".to_string(),
            roles: "Student".to_string(),
            group: "G1".to_string(),
            password: None,
        }],
        scores: vec![ScoreRow {
            rater: "carol".to_string(),
            target: "carol".to_string(),
            score: 5.0,
            timestamp: None,
        }],
    };

    assert!(import_bundle(&conn, &bundle, "1234").is_err());
    assert!(SqliteIndividualRepository::new(&conn)
        .list_individuals()
        .unwrap()
        .is_empty());
    assert!(SqliteGroupRepository::new(&conn)
        .list_groups()
        .unwrap()
        .is_empty());
}

#[test]
fn export_then_import_keeps_daily_trend() {
    let source = open_db_in_memory().unwrap();
    let ratings = SqliteRatingRepository::new(&source);
    ratings
        .upsert_rating_at("student6", "student1", 4.0, Some(86_400_000))
        .unwrap();
    ratings
        .upsert_rating_at("student7", "student1", 8.0, Some(172_800_000))
        .unwrap();

    let bundle = export_bundle(&source).unwrap();
    let target = open_db_in_memory().unwrap();
    import_bundle(&target, &bundle, "1234").unwrap();

    let expected = results(&source, ScoringConfig::default())
        .daily_trend()
        .unwrap();
    let actual = results(&target, ScoringConfig::default())
        .daily_trend()
        .unwrap();
    assert_eq!(actual, expected);
    let days: Vec<_> = actual.iter().map(|point| point.day.as_str()).collect();
    assert_eq!(days, ["1970-01-02", "1970-01-03"]);
}

#[test]
fn import_treats_blank_password_as_missing() {
    let conn = open_db_in_memory().unwrap();
    let bundle = Bundle {
        groups: vec!["G1".to_string()],
        users: vec![UserRow {
            username: "dave".to_string(),
            realname: "Dave".to_string(),
            roles: "Student".to_string(),
            group: "G1".to_string(),
            password: Some(String::new()),
        }],
        scores: Vec::new(),
    };

    import_bundle(&conn, &bundle, "fallback").unwrap();

    let accounts = AccountService::new(
        SqliteIndividualRepository::new(&conn),
        SqliteGroupRepository::new(&conn),
    );
    assert!(accounts.authenticate("dave", "").is_err());
    assert!(accounts.authenticate("dave", "fallback").is_ok());
}
