use approx::assert_relative_eq;
use rec_core::core::sampling::sample_users;
use rec_core::dataset::{read_ratings, Preprocessor};
use rec_core::persistence::{load_from_disk, save_to_disk};
use rec_core::{fit, ItemId, Learner, ModelConfig, RatingRecord, StorageKind, TransitionModel};

const A: u64 = 1;
const B: u64 = 2;
const C: u64 = 3;

fn movie_scenario() -> Vec<RatingRecord> {
    vec![
        RatingRecord::new(1, A, 5.0),
        RatingRecord::new(1, B, 4.0),
        RatingRecord::new(2, A, 5.0),
        RatingRecord::new(2, C, 3.0),
        RatingRecord::new(3, B, 4.0),
        RatingRecord::new(3, C, 4.0),
    ]
}

#[test]
fn three_user_movie_scenario() {
    let ratings = movie_scenario();
    assert_eq!(ratings[0].confidence(2.0), 11.0);
    assert_eq!(ratings[1].confidence(2.0), 9.0);
    assert_eq!(ratings[3].confidence(2.0), 7.0);

    let pairs = Learner::new(ModelConfig::new(2.0)).pair_strengths(&ratings).unwrap();
    assert_eq!(pairs[&(A, B)], 9.0);
    assert_eq!(pairs[&(B, A)], 9.0);
    assert_eq!(pairs[&(A, C)], 7.0);
    // user3 rates both B and C at 4, so the B/C pair carries min(9, 9).
    assert_eq!(pairs[&(B, C)], 9.0);
    assert_eq!(pairs[&(C, B)], 9.0);

    for storage in [StorageKind::Dense, StorageKind::Sparse] {
        let model = TransitionModel::fit(&ratings, &ModelConfig::new(2.0).with_storage(storage)).unwrap();
        assert_eq!(model.recommend(A, 1), vec![(B, 0.5625)]);
        assert_eq!(model.recommend(A, 5), vec![(B, 0.5625), (C, 0.4375)]);
        assert_relative_eq!(model.transition_probability(B, A).unwrap(), 0.5);
        assert_relative_eq!(model.transition_probability(C, B).unwrap(), 9.0 / 16.0);
    }
}

#[test]
fn unknown_item_returns_nothing_for_any_n() {
    let model = fit(&movie_scenario(), 2.0, 1.0).unwrap();
    for n in [0, 1, 10, usize::MAX] {
        assert!(model.recommend(404, n).is_empty());
    }
    assert!(model.recommend(A, 0).is_empty());
}

#[test]
fn csv_to_recommendations_survives_save_and_load() {
    let csv = "\
userId,movieId,rating,timestamp
1,1,5.0,100
1,2,4.0,101
1,3,2.0,102
2,1,4.5,103
2,2,3.0,104
3,2,5.0,105
3,3,5.0,106
3,4,1.0,107
4,4,3.0,108
";
    let ratings = read_ratings(csv.as_bytes()).unwrap();
    let filtered = Preprocessor::new(2, 2).filter(&ratings);
    // user 4 has a single rating; item 4 then has one rating left.
    assert!(filtered.iter().all(|r| r.user_id != 4 && r.item_id != 4));

    let model = TransitionModel::fit(&filtered, &ModelConfig::new(1.0)).unwrap();
    assert_eq!(model.items(), &[1, 2, 3]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    save_to_disk(&model, &path).unwrap();
    let loaded = load_from_disk(&path).unwrap();

    for item in [1, 2, 3, 4] {
        for n in [0, 1, 2, 5] {
            assert_eq!(loaded.recommend(item, n), model.recommend(item, n));
        }
    }
}

#[test]
fn refit_builds_a_new_model() {
    let first = fit(&movie_scenario(), 2.0, 1.0).unwrap();
    let mut more = movie_scenario();
    more.push(RatingRecord::new(4, A, 1.0));
    more.push(RatingRecord::new(4, C, 1.0));
    let second = fit(&more, 2.0, 1.0).unwrap();

    assert_eq!(first.recommend(A, 1), vec![(B, 0.5625)]);
    assert_ne!(first, second);
}

#[test]
fn sampled_fit_is_reproducible_with_seed() {
    let ratings: Vec<RatingRecord> = (0..40u64)
        .flat_map(|u| (0..4u64).map(move |i| RatingRecord::new(u, (u + i) % 12, ((u + i) % 5) as f64)))
        .collect();
    let config = ModelConfig::new(2.0).with_sample_fraction(0.5).with_seed(11);
    let a = TransitionModel::fit(&ratings, &config).unwrap();
    let b = TransitionModel::fit(&ratings, &config).unwrap();
    assert_eq!(a, b);
}

#[test]
fn sampled_fit_only_sees_whole_sampled_users() {
    let ratings: Vec<RatingRecord> = (0..40u64)
        .flat_map(|u| (0..4u64).map(move |i| RatingRecord::new(u, (u * 3 + i) % 17, ((u + i) % 5) as f64)))
        .collect();
    let subset = sample_users(&ratings, 0.5, Some(23));
    let mut kept_users: Vec<u64> = subset.iter().map(|r| r.user_id).collect();
    kept_users.dedup();
    assert_eq!(kept_users.len(), 20);

    let sampled = Learner::new(ModelConfig::new(2.0).with_sample_fraction(0.5).with_seed(23));
    let unsampled = Learner::new(ModelConfig::new(2.0));
    assert_eq!(
        sampled.pair_strengths(&ratings).unwrap(),
        unsampled.pair_strengths(&subset).unwrap()
    );

    let mut discovery_order: Vec<ItemId> = Vec::new();
    for record in &subset {
        if !discovery_order.contains(&record.item_id) {
            discovery_order.push(record.item_id);
        }
    }
    let model = sampled.fit(&ratings).unwrap();
    assert_eq!(model.items(), discovery_order.as_slice());
}
