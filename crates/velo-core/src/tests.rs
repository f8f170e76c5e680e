//! Unit tests for velo-core primitives.

#[cfg(test)]
mod ids {
    use crate::{EdgeId, NodeId};

    #[test]
    fn index_roundtrip() {
        let id = NodeId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(NodeId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(NodeId::INVALID.0, u32::MAX);
        assert_eq!(EdgeId::INVALID.0, u32::MAX);
        assert_eq!(EdgeId::default(), EdgeId::INVALID);
    }

    #[test]
    fn display() {
        assert_eq!(EdgeId(7).to_string(), "EdgeId(7)");
    }
}

#[cfg(test)]
mod geo {
    use crate::GeoPoint;

    #[test]
    fn zero_distance() {
        let p = GeoPoint::new(28.6005, 77.0469);
        assert!(p.distance_m(p) < 0.01);
    }

    #[test]
    fn one_degree_latitude() {
        let a = GeoPoint::new(28.0, 77.0);
        let b = GeoPoint::new(29.0, 77.0);
        let d = a.distance_m(b);
        assert!((d - 111_195.0).abs() < 500.0, "got {d}");
    }

    #[test]
    fn bbox_covers_radius() {
        let c = GeoPoint::new(28.6, 77.04);
        let half = c.bbox_half_deg(1_000.0);
        // A point 1 km due east must fall inside the box.
        let east = GeoPoint::new(28.6, 77.04 + 1_000.0 / (111_195.0 * 28.6f32.to_radians().cos()));
        assert!((east.lon - c.lon).abs() <= half + 1e-4);
    }
}

#[cfg(test)]
mod time {
    use crate::{Clock, ManualClock, Timestamp};

    #[test]
    fn manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(Timestamp(1_000));
        assert_eq!(clock.now(), Timestamp(1_000));
        clock.advance(250);
        assert_eq!(clock.now(), Timestamp(1_250));
    }

    #[test]
    fn millis_since_saturates() {
        assert_eq!(Timestamp(10).millis_since(Timestamp(4)), 6);
        assert_eq!(Timestamp(4).millis_since(Timestamp(10)), 0);
    }
}

#[cfg(test)]
mod rng {
    use crate::{PlannerRng, RolloutRng};

    #[test]
    fn same_seed_same_sample_seeds() {
        let a = PlannerRng::new(7).sample_seeds(16);
        let b = PlannerRng::new(7).sample_seeds(16);
        assert_eq!(a, b);
    }

    #[test]
    fn sample_seeds_are_distinct() {
        let seeds = PlannerRng::new(7).sample_seeds(64);
        let mut sorted = seeds.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), seeds.len());
    }

    #[test]
    fn consecutive_cycles_differ() {
        let mut rng = PlannerRng::new(1);
        let first = rng.sample_seeds(4);
        let second = rng.sample_seeds(4);
        assert_ne!(first, second);
    }

    #[test]
    fn rollout_unit_in_bounds() {
        let mut rng = RolloutRng::from_seed(3);
        for _ in 0..1000 {
            let v = rng.unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn gen_bool_extremes() {
        let mut rng = RolloutRng::from_seed(0);
        assert!(!rng.gen_bool(0.0));
        assert!(rng.gen_bool(1.0));
        assert!(rng.gen_bool(7.0)); // clamped
    }
}

#[cfg(test)]
mod road_class {
    use crate::RoadClass;

    #[test]
    fn osm_tags_fold_onto_classes() {
        assert_eq!(RoadClass::from_highway_tag("cycleway"), Some(RoadClass::Service));
        assert_eq!(RoadClass::from_highway_tag("residential"), Some(RoadClass::Internal));
        assert_eq!(RoadClass::from_highway_tag("primary"), Some(RoadClass::Arterial));
        assert_eq!(RoadClass::from_highway_tag("trunk"), Some(RoadClass::Highway));
        assert_eq!(RoadClass::from_highway_tag("steps"), None);
    }

    #[test]
    fn parse_names_and_tags() {
        assert_eq!("arterial".parse::<RoadClass>().unwrap(), RoadClass::Arterial);
        assert_eq!(" motorway ".parse::<RoadClass>().unwrap(), RoadClass::Highway);
        assert!("canal".parse::<RoadClass>().is_err());
    }

    #[test]
    fn classes_ordered_by_risk() {
        assert!(RoadClass::Service < RoadClass::Internal);
        assert!(RoadClass::Arterial < RoadClass::Highway);
    }
}

#[cfg(test)]
mod config {
    use crate::{AggregationPolicy, Config, HighwayPolicy, RoadClass};

    #[test]
    fn empty_document_is_default() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn sections_parse() {
        let cfg = Config::from_toml_str(
            r#"
            [planner]
            rollout_count = 8
            aggregation_policy = "risk_adjusted"
            risk_aversion = 1.5

            [cost]
            highway_policy = "avoid_when_possible"

            [safety_weights]
            highway = 100.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.planner.rollout_count, 8);
        assert_eq!(cfg.planner.aggregation_policy, AggregationPolicy::RiskAdjusted);
        assert_eq!(cfg.cost.highway_policy, HighwayPolicy::AvoidWhenPossible);
        assert_eq!(cfg.safety_weights.penalty(RoadClass::Highway), 100.0);
        // Untouched fields keep their defaults.
        assert_eq!(cfg.safety_weights.penalty(RoadClass::Service), 0.5);
    }

    #[test]
    fn zero_rollouts_rejected() {
        assert!(Config::from_toml_str("[planner]\nrollout_count = 0\n").is_err());
    }

    #[test]
    fn unordered_weights_rejected() {
        let doc = "[safety_weights]\nservice = 3.0\n";
        assert!(Config::from_toml_str(doc).is_err());
    }

    #[test]
    fn probability_out_of_range_rejected() {
        let doc = "[perturbation]\nmicro_closure_prob = 1.5\n";
        assert!(Config::from_toml_str(doc).is_err());
    }

    #[test]
    fn unknown_field_rejected() {
        assert!(Config::from_toml_str("[planner]\nrollouts = 3\n").is_err());
    }
}
