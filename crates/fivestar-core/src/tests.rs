//! Coordinator tests against `MemoryStore`.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error,
  coordinator::AggregationCoordinator,
  memory::MemoryStore,
  rating::{NewRating, Rating, Stars, UserSnapshot},
  ratings::RatingStore,
  store::Collection,
  summary::Summary,
};

type Coordinator = AggregationCoordinator<MemoryStore>;

fn setup() -> (Arc<MemoryStore>, Coordinator) {
  let store = Arc::new(MemoryStore::new());
  let coordinator = AggregationCoordinator::new(Arc::clone(&store));
  (store, coordinator)
}

fn user(id: &str) -> UserSnapshot {
  UserSnapshot {
    id:           id.into(),
    display_name: format!("User {id}"),
    image_url:    format!("https://img.example/{id}.png"),
  }
}

fn stars(n: i64) -> Stars { Stars::new(n).unwrap() }

async fn add(c: &Coordinator, user_id: &str, item: &str, n: i64) -> Rating {
  c.add_rating(NewRating::new(user(user_id), item, stars(n)))
    .await
    .unwrap()
    .rating
}

async fn counts(c: &Coordinator, item: &str) -> (i64, i64) {
  let s = c.summary(item).await.unwrap().expect("summary exists");
  (s.count, s.total)
}

async fn average(c: &Coordinator, item: &str) -> Option<f64> {
  c.summary(item).await.unwrap().expect("summary exists").average()
}

// ─── Add ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_rating_creates_summary() {
  for n in 1..=5 {
    let (_, c) = setup();
    let change = c
      .add_rating(NewRating::new(user("u1"), "item", stars(n)))
      .await
      .unwrap();

    assert!(change.rating.id.is_some());
    assert!(change.rating.is_active);
    assert_eq!(change.summary.rating_id, "item");
    assert_eq!((change.summary.count, change.summary.total), (1, n));
    assert_eq!(counts(&c, "item").await, (1, n));
  }
}

#[tokio::test]
async fn add_keeps_submitted_fields() {
  let (_, c) = setup();
  let mut input = NewRating::new(user("u1"), "item", stars(4));
  input.comment = "solid".into();
  input.images = vec!["a.png".into(), "b.png".into()];

  let rating = c.add_rating(input).await.unwrap().rating;
  let stored = c.rating(rating.id.unwrap()).await.unwrap().unwrap();
  assert_eq!(stored.comment, "solid");
  assert_eq!(stored.images, vec!["a.png", "b.png"]);
  assert_eq!(stored.user.display_name, "User u1");
  assert_eq!(stored.created_by.as_deref(), Some("u1"));
}

#[tokio::test]
async fn second_rating_by_same_user_conflicts() {
  let (store, c) = setup();
  add(&c, "u1", "item", 4).await;

  let err = c
    .add_rating(NewRating::new(user("u1"), "item", stars(2)))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));
  assert_eq!(counts(&c, "item").await, (1, 4));
  assert_eq!(store.len(Collection::Ratings).await, 1);
}

#[tokio::test]
async fn same_user_may_rate_other_items() {
  let (_, c) = setup();
  add(&c, "u1", "a", 4).await;
  add(&c, "u1", "b", 2).await;
  assert_eq!(counts(&c, "a").await, (1, 4));
  assert_eq!(counts(&c, "b").await, (1, 2));
}

#[tokio::test]
async fn blocked_user_cannot_rate_again() {
  let (_, c) = setup();
  let rating = add(&c, "u1", "item", 5).await;
  c.block_rating(&rating, Some("mod".into())).await.unwrap();

  let err = c
    .add_rating(NewRating::new(user("u1"), "item", stars(1)))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));
  assert_eq!(counts(&c, "item").await, (0, 0));
}

#[tokio::test]
async fn anonymous_user_is_rejected() {
  let (store, c) = setup();
  let err = c
    .add_rating(NewRating::new(UserSnapshot::default(), "item", stars(3)))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthenticated));
  assert_eq!(store.len(Collection::Ratings).await, 0);
  assert!(c.summary("item").await.unwrap().is_none());
}

#[tokio::test]
async fn empty_rating_id_is_invalid() {
  let (_, c) = setup();
  let err = c
    .add_rating(NewRating::new(user("u1"), "  ", stars(3)))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Invalid(_)));
}

// ─── Edit ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn edit_shifts_total_by_difference() {
  let (_, c) = setup();
  let original = add(&c, "u1", "item", 3).await;

  let updated = Rating { rating: stars(5), comment: "better".into(), ..original.clone() };
  let change = c.edit_rating(&original, updated).await.unwrap();

  assert_eq!(change.rating.rating, stars(5));
  assert_eq!(change.rating.comment, "better");
  assert!(change.rating.last_updated_on.is_some());
  assert_eq!(change.rating.created_on, original.created_on);
  assert_eq!(counts(&c, "item").await, (1, 5));
}

#[tokio::test]
async fn edit_without_star_change_keeps_summary() {
  let (_, c) = setup();
  let original = add(&c, "u1", "item", 3).await;
  let updated = Rating { comment: "typo fixed".into(), ..original.clone() };

  c.edit_rating(&original, updated).await.unwrap();
  assert_eq!(counts(&c, "item").await, (1, 3));
}

#[tokio::test]
async fn edit_with_stale_snapshot_conflicts() {
  let (_, c) = setup();
  let original = add(&c, "u1", "item", 3).await;
  let first = Rating { rating: stars(5), ..original.clone() };
  c.edit_rating(&original, first).await.unwrap();

  // Second edit still claims the rating was 3.
  let second = Rating { rating: stars(1), ..original.clone() };
  let err = c.edit_rating(&original, second).await.unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));

  let stored = c.rating(original.id.unwrap()).await.unwrap().unwrap();
  assert_eq!(stored.rating, stars(5));
  assert_eq!(counts(&c, "item").await, (1, 5));
}

#[tokio::test]
async fn edit_cannot_change_identity() {
  let (_, c) = setup();
  let original = add(&c, "u1", "item", 3).await;

  let moved = Rating { rating_id: "other".into(), ..original.clone() };
  assert!(matches!(c.edit_rating(&original, moved).await, Err(Error::Invalid(_))));

  let reauthored = Rating { user: user("u2"), ..original.clone() };
  assert!(matches!(c.edit_rating(&original, reauthored).await, Err(Error::Invalid(_))));

  let rekeyed = Rating { id: Some(Uuid::new_v4()), ..original.clone() };
  assert!(matches!(c.edit_rating(&original, rekeyed).await, Err(Error::Invalid(_))));

  assert_eq!(counts(&c, "item").await, (1, 3));
}

#[tokio::test]
async fn edit_of_blocked_rating_does_not_count_it() {
  let (_, c) = setup();
  let original = add(&c, "u1", "item", 2).await;
  let blocked = c.block_rating(&original, None).await.unwrap().rating;

  // Try to sneak `is_active` back in alongside a star change.
  let updated = Rating { rating: stars(5), is_active: true, ..blocked.clone() };
  let change = c.edit_rating(&blocked, updated).await.unwrap();

  assert!(!change.rating.is_active);
  assert_eq!(change.rating.rating, stars(5));
  assert_eq!(counts(&c, "item").await, (0, 0));
}

#[tokio::test]
async fn edit_of_unpersisted_rating_is_invalid() {
  let (_, c) = setup();
  let draft = NewRating::new(user("u1"), "item", stars(3)).into_rating(chrono::Utc::now());
  let err = c.edit_rating(&draft, draft.clone()).await.unwrap_err();
  assert!(matches!(err, Error::Invalid(_)));
}

#[tokio::test]
async fn edit_without_summary_leaves_rating_untouched() {
  let (store, c) = setup();
  // A rating whose summary was never written.
  let orphan = RatingStore::new(Arc::clone(&store))
    .insert(&NewRating::new(user("u1"), "item", stars(3)).into_rating(chrono::Utc::now()))
    .await
    .unwrap();

  let updated = Rating { rating: stars(5), ..orphan.clone() };
  let err = c.edit_rating(&orphan, updated).await.unwrap_err();
  assert!(matches!(err, Error::SummaryNotFound(ref id) if id == "item"));

  let stored = c.rating(orphan.id.unwrap()).await.unwrap().unwrap();
  assert_eq!(stored.rating, stars(3));
}

// ─── Block ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn block_excludes_rating_once() {
  let (_, c) = setup();
  let rating = add(&c, "u1", "item", 4).await;
  add(&c, "u2", "item", 2).await;

  let change = c.block_rating(&rating, Some("mod".into())).await.unwrap();
  assert!(!change.rating.is_active);
  assert!(change.rating.deleted_on.is_some());
  assert_eq!(change.rating.deleted_by.as_deref(), Some("mod"));
  assert_eq!((change.summary.count, change.summary.total), (1, 2));

  let again = c.block_rating(&rating, Some("mod".into())).await.unwrap();
  assert_eq!((again.summary.count, again.summary.total), (1, 2));
  assert_eq!(again.rating.deleted_on, change.rating.deleted_on);
  assert_eq!(counts(&c, "item").await, (1, 2));
}

#[tokio::test]
async fn blocked_rating_is_hidden_from_listing() {
  let (_, c) = setup();
  let rating = add(&c, "u1", "item", 4).await;
  add(&c, "u2", "item", 2).await;
  c.block_rating(&rating, None).await.unwrap();

  assert_eq!(c.ratings_for("item", false).await.unwrap().len(), 1);
  assert_eq!(c.ratings_for("item", true).await.unwrap().len(), 2);
  assert!(c.existing_rating("item", "u1").await.unwrap().is_some());
}

#[tokio::test]
async fn reblocking_without_summary_is_a_no_op() {
  let (store, c) = setup();
  // A blocked rating whose summary was never written.
  let mut blocked = NewRating::new(user("u1"), "item", stars(3)).into_rating(chrono::Utc::now());
  blocked.is_active = false;
  let blocked = RatingStore::new(Arc::clone(&store)).insert(&blocked).await.unwrap();

  let change = c.block_rating(&blocked, Some("mod".into())).await.unwrap();
  assert!(!change.rating.is_active);
  assert_eq!(change.rating.deleted_by, blocked.deleted_by);
  assert_eq!((change.summary.count, change.summary.total), (0, 0));
  assert!(c.summary("item").await.unwrap().is_none());
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_rating_and_its_points() {
  let (store, c) = setup();
  let rating = add(&c, "u1", "item", 5).await;
  add(&c, "u2", "item", 3).await;

  let change = c.delete_rating(&rating).await.unwrap();
  assert_eq!((change.summary.count, change.summary.total), (1, 3));
  assert!(c.rating(rating.id.unwrap()).await.unwrap().is_none());
  assert_eq!(store.len(Collection::Ratings).await, 1);
}

#[tokio::test]
async fn delete_after_block_does_not_decrement_twice() {
  let (_, c) = setup();
  let rating = add(&c, "u1", "item", 4).await;
  c.block_rating(&rating, None).await.unwrap();
  assert_eq!(counts(&c, "item").await, (0, 0));

  c.delete_rating(&rating).await.unwrap();
  assert_eq!(counts(&c, "item").await, (0, 0));
}

#[tokio::test]
async fn delete_missing_rating_is_not_found() {
  let (_, c) = setup();
  let rating = add(&c, "u1", "item", 4).await;
  c.delete_rating(&rating).await.unwrap();

  let err = c.delete_rating(&rating).await.unwrap_err();
  assert!(matches!(err, Error::RatingNotFound(id) if Some(id) == rating.id));
  assert_eq!(counts(&c, "item").await, (0, 0));
}

#[tokio::test]
async fn summary_survives_last_rating() {
  let (store, c) = setup();
  let rating = add(&c, "u1", "item", 4).await;
  c.delete_rating(&rating).await.unwrap();

  let summary = c.summary("item").await.unwrap().unwrap();
  assert_eq!(summary.average(), None);
  assert_eq!(store.len(Collection::Summaries).await, 1);

  add(&c, "u2", "item", 2).await;
  assert_eq!(counts(&c, "item").await, (1, 2));
  assert_eq!(store.len(Collection::Summaries).await, 1);
}

// ─── Scenario ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_lifecycle_of_one_item() {
  let (_, c) = setup();
  let avg = |s: Summary| s.average();

  let a = add(&c, "a", "item-42", 4).await;
  let b = add(&c, "b", "item-42", 2).await;
  assert_eq!(counts(&c, "item-42").await, (2, 6));

  let b_edit = Rating { rating: stars(5), ..b.clone() };
  let b = c.edit_rating(&b, b_edit).await.unwrap().rating;
  let s = c.summary("item-42").await.unwrap().unwrap();
  assert_eq!((s.count, s.total), (2, 9));
  assert_eq!(avg(s), Some(4.5));

  c.block_rating(&a, None).await.unwrap();
  let s = c.summary("item-42").await.unwrap().unwrap();
  assert_eq!((s.count, s.total), (1, 5));
  assert_eq!(avg(s), Some(5.0));

  c.delete_rating(&a).await.unwrap();
  assert_eq!(counts(&c, "item-42").await, (1, 5));

  c.delete_rating(&b).await.unwrap();
  let s = c.summary("item-42").await.unwrap().unwrap();
  assert_eq!((s.count, s.total), (0, 0));
  assert_eq!(avg(s), None);
}

#[tokio::test]
async fn edit_then_block_keeps_average_in_step() {
  let (_, c) = setup();

  let u1 = add(&c, "u1", "item-42", 5).await;
  assert_eq!(average(&c, "item-42").await, Some(5.0));

  let u2 = add(&c, "u2", "item-42", 3).await;
  assert_eq!(counts(&c, "item-42").await, (2, 8));
  assert_eq!(average(&c, "item-42").await, Some(4.0));

  let u1_edit = Rating { rating: stars(4), ..u1.clone() };
  c.edit_rating(&u1, u1_edit).await.unwrap();
  assert_eq!(counts(&c, "item-42").await, (2, 7));
  assert_eq!(average(&c, "item-42").await, Some(3.5));

  c.block_rating(&u2, None).await.unwrap();
  assert_eq!(counts(&c, "item-42").await, (1, 4));
  assert_eq!(average(&c, "item-42").await, Some(4.0));
}

#[tokio::test]
async fn batch_summary_lookup_skips_unrated_items() {
  let (_, c) = setup();
  add(&c, "u1", "a", 4).await;
  add(&c, "u1", "b", 2).await;

  let ids = vec!["a".to_owned(), "b".to_owned(), "never".to_owned()];
  let mut found = c.summaries(&ids).await.unwrap();
  found.sort_by(|x, y| x.rating_id.cmp(&y.rating_id));
  let ids: Vec<_> = found.iter().map(|s| s.rating_id.as_str()).collect();
  assert_eq!(ids, vec!["a", "b"]);

  assert!(c.summaries(&[]).await.unwrap().is_empty());
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_are_all_counted() {
  let (_, c) = setup();
  let c = Arc::new(c);

  let tasks: Vec<_> = (0..20)
    .map(|i| {
      let c = Arc::clone(&c);
      tokio::spawn(async move {
        let input = NewRating::new(user(&format!("u{i}")), "item", stars(i % 5 + 1));
        c.add_rating(input).await
      })
    })
    .collect();
  for task in tasks {
    task.await.unwrap().unwrap();
  }

  let expected_total: i64 = (0..20).map(|i| i % 5 + 1).sum();
  assert_eq!(counts(&c, "item").await, (20, expected_total));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_admit_one() {
  let (store, c) = setup();
  let c = Arc::new(c);

  let tasks: Vec<_> = (0..8)
    .map(|_| {
      let c = Arc::clone(&c);
      tokio::spawn(async move {
        c.add_rating(NewRating::new(user("u1"), "item", stars(3)))
          .await
      })
    })
    .collect();

  let mut created = 0;
  for task in tasks {
    match task.await.unwrap() {
      Ok(_) => created += 1,
      Err(Error::Conflict(_)) => {}
      Err(e) => panic!("unexpected error: {e}"),
    }
  }

  assert_eq!(created, 1);
  assert_eq!(store.len(Collection::Ratings).await, 1);
  assert_eq!(counts(&c, "item").await, (1, 3));
}

// ─── Partial failure and reconcile ───────────────────────────────────────────

#[tokio::test]
async fn failed_summary_write_is_repaired_by_reconcile() {
  let (store, c) = setup();
  add(&c, "u1", "item", 4).await;

  store.fail_writes(Collection::Summaries).await;
  let err = c
    .add_rating(NewRating::new(user("u2"), "item", stars(2)))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Store(_)));
  store.heal().await;

  // The rating committed; the summary did not.
  assert_eq!(store.len(Collection::Ratings).await, 2);
  assert_eq!(counts(&c, "item").await, (1, 4));

  let repaired = c.reconcile("item").await.unwrap();
  assert_eq!((repaired.count, repaired.total), (2, 6));
  assert_eq!(counts(&c, "item").await, (2, 6));
}

#[tokio::test]
async fn failed_rating_write_leaves_summary_alone() {
  let (store, c) = setup();
  let rating = add(&c, "u1", "item", 4).await;

  store.fail_writes(Collection::Ratings).await;
  let err = c.block_rating(&rating, None).await.unwrap_err();
  assert!(matches!(err, Error::Store(_)));
  store.heal().await;

  assert_eq!(counts(&c, "item").await, (1, 4));
  assert!(c.rating(rating.id.unwrap()).await.unwrap().unwrap().is_active);
}

#[tokio::test]
async fn reconcile_creates_missing_summary() {
  let (store, c) = setup();
  RatingStore::new(Arc::clone(&store))
    .insert(&NewRating::new(user("u1"), "item", stars(5)).into_rating(chrono::Utc::now()))
    .await
    .unwrap();
  assert!(c.summary("item").await.unwrap().is_none());

  let summary = c.reconcile("item").await.unwrap();
  assert!(summary.id.is_some());
  assert_eq!((summary.count, summary.total), (1, 5));
}

#[tokio::test]
async fn reconcile_is_a_no_op_when_consistent() {
  let (_, c) = setup();
  let a = add(&c, "u1", "item", 4).await;
  add(&c, "u2", "item", 1).await;
  c.block_rating(&a, None).await.unwrap();

  let before = c.summary("item").await.unwrap().unwrap();
  let after = c.reconcile("item").await.unwrap();
  assert_eq!(before, after);
}

#[tokio::test]
async fn reconcile_of_unrated_item_persists_nothing() {
  let (store, c) = setup();
  let summary = c.reconcile("nothing").await.unwrap();
  assert_eq!(summary, Summary::empty("nothing"));
  assert_eq!(store.len(Collection::Summaries).await, 0);
}
