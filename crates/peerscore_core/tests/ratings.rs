use peerscore_core::credentials::PasswordDigest;
use peerscore_core::db::open_db_in_memory;
use peerscore_core::service::seed::seed_defaults;
use peerscore_core::{
    Individual, IndividualRepository, RatingError, RatingRepository, RatingScales, RatingService,
    RepoError, Role, RoleSet, SqliteGroupRepository, SqliteIndividualRepository,
    SqliteRatingRepository, ValidationError,
};
use rusqlite::Connection;

fn seeded() -> Connection {
    let conn = open_db_in_memory().unwrap();
    seed_defaults(
        &SqliteIndividualRepository::new(&conn),
        &SqliteGroupRepository::new(&conn),
        "1234",
    )
    .unwrap();
    conn
}

fn service(
    conn: &Connection,
) -> RatingService<SqliteIndividualRepository<'_>, SqliteRatingRepository<'_>> {
    RatingService::new(
        SqliteIndividualRepository::new(conn),
        SqliteRatingRepository::new(conn),
        RatingScales::default(),
    )
}

fn pairs(items: &[(&str, f64)]) -> Vec<(String, f64)> {
    items
        .iter()
        .map(|(target, score)| ((*target).to_string(), *score))
        .collect()
}

#[test]
fn upsert_replaces_previous_score_for_same_pair() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRatingRepository::new(&conn);

    repo.upsert_rating("student6", "student1", 4.0).unwrap();
    repo.upsert_rating("student6", "student1", 9.0).unwrap();
    repo.upsert_rating("student7", "student1", 5.0).unwrap();

    let ratings = repo.list_ratings().unwrap();
    assert_eq!(ratings.len(), 2);
    assert_eq!(ratings[0].rater, "student6");
    assert_eq!(ratings[0].score, 9.0);
    assert!(ratings[0].timestamp > 0);
}

#[test]
fn upsert_at_keeps_supplied_timestamp() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRatingRepository::new(&conn);

    repo.upsert_rating_at("student6", "student1", 4.0, Some(86_400_000))
        .unwrap();
    repo.upsert_rating_at("student7", "student1", 6.0, None)
        .unwrap();

    let ratings = repo.list_ratings().unwrap();
    assert_eq!(ratings[0].timestamp, 86_400_000);
    assert!(ratings[1].timestamp > 86_400_000);
}

#[test]
fn upsert_rejects_self_rating_and_negative_scores() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRatingRepository::new(&conn);

    assert!(matches!(
        repo.upsert_rating("student1", "student1", 5.0),
        Err(RepoError::Validation(ValidationError::SelfRating(_)))
    ));
    assert!(matches!(
        repo.upsert_rating("student1", "student2", -1.0),
        Err(RepoError::Validation(ValidationError::InvalidScore(_)))
    ));
    assert!(repo.list_ratings().unwrap().is_empty());
}

#[test]
fn save_ratings_writes_nothing_when_one_row_is_invalid() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRatingRepository::new(&conn);

    let err = repo
        .save_ratings(
            "student6",
            &pairs(&[("student1", 7.0), ("student6", 8.0)]),
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert!(repo.list_ratings().unwrap().is_empty());

    let saved = repo
        .save_ratings(
            "student6",
            &pairs(&[("student1", 7.0), ("student2", 8.0)]),
        )
        .unwrap();
    assert_eq!(saved, 2);
    assert_eq!(repo.list_ratings().unwrap().len(), 2);
}

#[test]
fn ratings_for_target_are_sorted_highest_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRatingRepository::new(&conn);
    repo.upsert_rating("student6", "student1", 4.0).unwrap();
    repo.upsert_rating("teacher1", "student1", 12.0).unwrap();
    repo.upsert_rating("student7", "student1", 8.0).unwrap();
    repo.upsert_rating("student7", "student2", 10.0).unwrap();

    let scores: Vec<_> = repo
        .list_ratings_for_target("student1")
        .unwrap()
        .into_iter()
        .map(|rating| (rating.rater, rating.score))
        .collect();
    assert_eq!(
        scores,
        [
            ("teacher1".to_string(), 12.0),
            ("student7".to_string(), 8.0),
            ("student6".to_string(), 4.0),
        ]
    );
}

#[test]
fn daily_trend_groups_by_day_and_target() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO scores (rater, target, score, timestamp) VALUES
            ('student6', 'student1', 4.0, 86400000),
            ('student7', 'student1', 8.0, 86400000 + 3600000),
            ('student8', 'student1', 10.0, 2 * 86400000),
            ('student6', 'student2', 6.0, 86400000);",
    )
    .unwrap();

    let trend = SqliteRatingRepository::new(&conn).daily_trend().unwrap();
    let summary: Vec<_> = trend
        .iter()
        .map(|point| {
            (
                point.day.as_str(),
                point.target.as_str(),
                point.mean_score,
                point.rating_count,
            )
        })
        .collect();
    assert_eq!(
        summary,
        [
            ("1970-01-02", "student1", 6.0, 2),
            ("1970-01-02", "student2", 6.0, 1),
            ("1970-01-03", "student1", 10.0, 1),
        ]
    );
}

#[test]
fn student_targets_exclude_own_group() {
    let conn = seeded();
    let targets: Vec<_> = service(&conn)
        .eligible_targets("student1")
        .unwrap()
        .into_iter()
        .map(|individual| individual.username)
        .collect();

    assert_eq!(targets.len(), 10);
    assert!(targets.iter().all(|name| name.starts_with("student")));
    for own_group in ["student1", "student2", "student3", "student4", "student5"] {
        assert!(!targets.iter().any(|name| name == own_group));
    }
}

#[test]
fn teacher_targets_every_student_on_teacher_scale() {
    let conn = seeded();
    let service = service(&conn);

    let targets = service.eligible_targets("teacher1").unwrap();
    assert_eq!(targets.len(), 15);
    assert!(targets.iter().all(Individual::is_student));

    let teacher = SqliteIndividualRepository::new(&conn)
        .get_individual("teacher1")
        .unwrap()
        .unwrap();
    assert_eq!(service.scale_max_for(&teacher).unwrap(), 15.0);
}

#[test]
fn admin_and_unknown_raters_cannot_rate() {
    let conn = seeded();
    let service = service(&conn);

    assert!(matches!(
        service.eligible_targets("admin1"),
        Err(RatingError::NotARater(name)) if name == "admin1"
    ));
    assert!(matches!(
        service.submit("ghost", &pairs(&[("student1", 5.0)])),
        Err(RatingError::RaterNotFound(_))
    ));
}

#[test]
fn submit_enforces_scale_bounds_per_role() {
    let conn = seeded();
    let service = service(&conn);

    assert!(matches!(
        service.submit("student1", &pairs(&[("student6", 11.0)])),
        Err(RatingError::ScoreOutOfRange { max, .. }) if max == 10.0
    ));
    assert!(matches!(
        service.submit("student1", &pairs(&[("student6", 0.5)])),
        Err(RatingError::ScoreOutOfRange { .. })
    ));
    assert_eq!(
        service
            .submit("teacher1", &pairs(&[("student6", 15.0)]))
            .unwrap(),
        1
    );
}

#[test]
fn submit_is_all_or_nothing() {
    let conn = seeded();
    let service = service(&conn);

    let err = service
        .submit(
            "student1",
            &pairs(&[("student6", 8.0), ("student2", 9.0)]),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RatingError::IneligibleTarget { ref target, .. } if target == "student2"
    ));
    assert!(matches!(
        service.submit("student1", &[]),
        Err(RatingError::EmptySubmission)
    ));
    assert!(SqliteRatingRepository::new(&conn)
        .list_ratings()
        .unwrap()
        .is_empty());

    let saved = service
        .submit(
            "student1",
            &pairs(&[("student6", 8.0), ("student11", 9.0)]),
        )
        .unwrap();
    assert_eq!(saved, 2);
}

#[test]
fn student_teacher_rates_on_student_scale() {
    let conn = seeded();
    SqliteIndividualRepository::new(&conn)
        .create_individual(
            &Individual::new(
                "ta1",
                "Teaching Assistant",
                "Group 2",
                RoleSet::new().with(Role::Student).with(Role::Teacher),
            ),
            &PasswordDigest::derive("1234"),
        )
        .unwrap();
    let service = service(&conn);

    let ta = SqliteIndividualRepository::new(&conn)
        .get_individual("ta1")
        .unwrap()
        .unwrap();
    assert_eq!(service.scale_max_for(&ta).unwrap(), 10.0);
    assert!(service
        .eligible_targets("ta1")
        .unwrap()
        .iter()
        .all(|target| target.group != "Group 2"));
}
