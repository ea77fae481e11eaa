//! The SQL rendering of every period relation agrees with the Rust predicate,
//! and period splitting and coverage behave as set operations.

use proptest::prelude::*;

use sixnf_core::models::{Params, Period, SqlValue, Timestamp};
use sixnf_core::traits::ISqlEngine;
use sixnf_storage::SqliteEngine;
use sixnf_temporal::algebra::{Operand, Relation, Span};
use sixnf_temporal::pipeline::{covers, split};
use sixnf_temporal::translator::SystemTimeFilter;

/// Index 20 is the infinity sentinel; everything below is a whole second.
const INFINITY_INDEX: u32 = 20;

fn ts(index: u32) -> Timestamp {
    if index >= INFINITY_INDEX {
        return Timestamp::Infinity;
    }
    Timestamp::parse(&format!("2020-01-01 00:00:{index:02}.000")).unwrap()
}

fn period(start: u32, end: u32) -> Period {
    Period::new(ts(start), ts(end)).unwrap()
}

fn span() -> impl Strategy<Value = Span> {
    (0u32..INFINITY_INDEX, 0u32..=INFINITY_INDEX, any::<bool>()).prop_map(|(a, b, instant)| {
        if instant {
            Span::Instant(ts(b))
        } else {
            Span::Period(period(a, b.max(a + 1)))
        }
    })
}

fn index_period() -> impl Strategy<Value = (u32, u32)> {
    (0u32..INFINITY_INDEX, 1u32..=INFINITY_INDEX).prop_map(|(a, len)| (a, (a + len).min(INFINITY_INDEX)))
}

fn operand(span: Span) -> Operand {
    match span {
        Span::Period(p) => Operand::Period {
            start: p.start.sql_literal(),
            end: p.end.sql_literal(),
        },
        Span::Instant(t) => Operand::Instant(t.sql_literal()),
    }
}

fn sql_holds(engine: &SqliteEngine, relation: Relation, a: Span, b: Span) -> bool {
    let sql = format!(
        "SELECT CASE WHEN {} THEN 1 ELSE 0 END",
        relation.render(&operand(a), &operand(b))
    );
    evaluates_true(engine, &sql)
}

fn evaluates_true(engine: &SqliteEngine, sql: &str) -> bool {
    let rows = engine.query(sql, &Params::None).unwrap();
    rows.scalar() == Some(&SqlValue::Integer(1))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_sql_rendering_matches_predicate(pairs in prop::collection::vec((span(), span()), 1..8)) {
        let engine = SqliteEngine::open_in_memory().unwrap();
        for (a, b) in pairs {
            for relation in Relation::ALL {
                prop_assert_eq!(
                    sql_holds(&engine, relation, a, b),
                    relation.holds(a, b),
                    "{} {:?} {:?}", relation.keyword(), a, b
                );
            }
        }
    }

    #[test]
    fn prop_as_of_filter_is_containment(
        versions in prop::collection::vec((index_period(), 0u32..=INFINITY_INDEX), 1..8),
    ) {
        let engine = SqliteEngine::open_in_memory().unwrap();
        for ((start, end), at) in versions {
            let recorded = period(start, end);
            let t = ts(at);
            let sql = format!(
                "SELECT CASE WHEN {} THEN 1 ELSE 0 END",
                SystemTimeFilter::AsOf(t).predicate(&recorded.start.sql_literal(), &recorded.end.sql_literal())
            );
            let expected = Relation::Contains.holds(Span::Period(recorded), Span::Instant(t));
            prop_assert_eq!(expected, recorded.start <= t && recorded.end > t);
            prop_assert_eq!(evaluates_true(&engine, &sql), expected, "{:?} as of {:?}", recorded, t);
        }
    }
}

proptest! {
    #[test]
    fn prop_split_partitions_the_valid_period(valid in index_period(), portion in index_period()) {
        let valid_period = period(valid.0, valid.1);
        let portion_period = period(portion.0, portion.1);
        let pieces = split(valid_period, portion_period);

        prop_assert!(!pieces.is_empty());
        prop_assert_eq!(pieces[0].0.start, valid_period.start);
        prop_assert_eq!(pieces[pieces.len() - 1].0.end, valid_period.end);
        for pair in pieces.windows(2) {
            prop_assert_eq!(pair[0].0.end, pair[1].0.start);
        }

        let during: Vec<Period> = pieces.iter().filter(|(_, d)| *d).map(|(p, _)| *p).collect();
        let start = valid.0.max(portion.0);
        let end = valid.1.min(portion.1);
        if start < end {
            prop_assert_eq!(during, vec![period(start, end)]);
        } else {
            prop_assert!(during.is_empty());
        }
    }

    #[test]
    fn prop_covers_matches_unit_coverage(
        parts in prop::collection::vec(index_period(), 0..6),
        need in index_period(),
    ) {
        let expected = (need.0..need.1).all(|unit| {
            parts.iter().any(|&(s, e)| s <= unit && unit + 1 <= e)
        });
        let mut periods: Vec<Period> = parts.iter().map(|&(s, e)| period(s, e)).collect();
        prop_assert_eq!(covers(&mut periods, period(need.0, need.1)), expected);
    }
}
