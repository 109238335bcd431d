//! Exercises the crate through its public re-exports only, as a downstream
//! caller would.
#![allow(clippy::cast_precision_loss)]

use indexmap::IndexMap;

use boxscan::{bottom_up_init, BitMask, BottomUpEngine, ColumnName, Data, EngineConfig, RawValue};

#[test]
fn end_to_end_through_public_surface() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut columns = IndexMap::new();
    columns.insert(
        ColumnName::new("region"),
        vec![
            RawValue::Nominal("west".into()),
            RawValue::Nominal("west".into()),
            RawValue::Nominal("east".into()),
            RawValue::Nominal("east".into()),
        ],
    );
    columns.insert(
        ColumnName::new("status"),
        vec![
            RawValue::Ordinal(1),
            RawValue::Ordinal(0),
            RawValue::Ordinal(1),
            RawValue::Ordinal(0),
        ],
    );
    let mut data = Data::load(columns);

    let anomaly = [true, false, false, false];
    let score = move |mask: &BitMask| -> f64 {
        let hits = mask.iter_ones().filter(|&i| anomaly[i]).count() as f64;
        hits - 0.5 * mask.count_ones() as f64
    };

    let config = EngineConfig::default();
    let (arena, bases) = bottom_up_init(&mut data, &config, None).unwrap();
    let mut engine = BottomUpEngine::new(&data, arena, bases, &score);
    let result = engine.refine(&config).unwrap();

    assert_eq!(result.len(), 1);
    let conj = engine.arena().get(result[0]);
    assert_eq!(conj.keys().len(), 2);
}
