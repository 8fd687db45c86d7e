use approx::assert_abs_diff_eq;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use std::sync::Arc;

use tabprep::exceptions::{TabPrepError, TabPrepResult};
use tabprep::transformers::outlier_detection::{
    column_statistics, detect_outliers, detect_outliers_in_batch, OutlierValue,
    DEFAULT_MULTIPLIER,
};

/// Builds a batch with a Float64 column "x", an Int64 column "n" and a Utf8 column "label".
fn create_batch(x: Vec<Option<f64>>, n: Vec<i64>) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::Float64, true),
        Field::new("n", DataType::Int64, false),
        Field::new("label", DataType::Utf8, false),
    ]));
    let labels: Vec<String> = (0..n.len()).map(|i| format!("row{}", i)).collect();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(x)),
        Arc::new(Int64Array::from(n)),
        Arc::new(StringArray::from(labels)),
    ];
    RecordBatch::try_new(schema, columns).unwrap()
}

async fn create_df(batch: RecordBatch) -> DataFrame {
    let mem_table = MemTable::try_new(batch.schema(), vec![vec![batch]]).unwrap();
    let ctx = SessionContext::new();
    ctx.register_table("t", Arc::new(mem_table)).unwrap();
    ctx.table("t").await.unwrap()
}

fn example_batch() -> RecordBatch {
    create_batch(
        vec![
            Some(1.0),
            Some(2.0),
            Some(2.0),
            Some(3.0),
            Some(4.0),
            Some(5.0),
            Some(100.0),
        ],
        vec![10, 11, 12, 13, 14, 15, 16],
    )
}

#[tokio::test]
async fn test_detect_outliers_example_column() -> TabPrepResult<()> {
    let df = create_df(example_batch()).await;
    let reports = detect_outliers(&df, DEFAULT_MULTIPLIER).await?;

    // Only the numeric columns are reported.
    assert_eq!(reports.len(), 2);
    assert!(!reports.contains_key("label"));

    let x = &reports["x"];
    assert_abs_diff_eq!(x.statistics.q1, 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(x.statistics.q3, 4.5, epsilon = 1e-9);
    assert_abs_diff_eq!(x.statistics.iqr, 2.5, epsilon = 1e-9);
    assert_abs_diff_eq!(x.statistics.lower_bound, -1.75, epsilon = 1e-9);
    assert_abs_diff_eq!(x.statistics.upper_bound, 8.25, epsilon = 1e-9);
    assert_eq!(
        x.outliers,
        vec![OutlierValue {
            row: 6,
            value: 100.0
        }]
    );

    let n = &reports["n"];
    assert!(n.outliers.is_empty());
    assert_abs_diff_eq!(n.statistics.mean, 13.0, epsilon = 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_detect_outliers_matches_batch_detection() -> TabPrepResult<()> {
    let batch = example_batch();
    let from_batch = detect_outliers_in_batch(&batch, 1.0)?;
    let df = create_df(batch).await;
    let from_df = detect_outliers(&df, 1.0).await?;
    assert_eq!(from_batch, from_df);
    Ok(())
}

#[test]
fn test_missing_values_are_skipped() -> TabPrepResult<()> {
    let batch = create_batch(
        vec![Some(1.0), None, Some(2.0), Some(f64::NAN), Some(3.0), Some(50.0)],
        vec![1, 1, 1, 1, 1, 1],
    );
    let reports = detect_outliers_in_batch(&batch, DEFAULT_MULTIPLIER)?;
    let x = &reports["x"];
    assert_eq!(x.statistics.count, 4);
    assert_eq!(x.rows().collect::<Vec<_>>(), vec![5]);
    Ok(())
}

#[test]
fn test_degenerate_column_flags_every_differing_value() -> TabPrepResult<()> {
    let batch = create_batch(
        vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0)],
        vec![5, 5, 5, 5],
    );
    let reports = detect_outliers_in_batch(&batch, DEFAULT_MULTIPLIER)?;
    assert_eq!(reports["x"].statistics.iqr, 0.0);
    assert!(reports["x"].outliers.is_empty());

    let batch = create_batch(vec![Some(0.0); 8], vec![5, 5, 5, 5, 5, 5, 6, 4]);
    let reports = detect_outliers_in_batch(&batch, DEFAULT_MULTIPLIER)?;
    let n = &reports["n"];
    assert_eq!(n.statistics.lower_bound, 5.0);
    assert_eq!(n.statistics.upper_bound, 5.0);
    assert_eq!(n.rows().collect::<Vec<_>>(), vec![6, 7]);
    Ok(())
}

#[test]
fn test_bounds_enclose_quartiles() -> TabPrepResult<()> {
    let tables = vec![
        example_batch(),
        create_batch(
            vec![Some(-3.5), Some(0.0), Some(7.25), Some(7.25), Some(-100.0)],
            vec![-1, 0, 1, 1000, -1000],
        ),
        create_batch(vec![Some(42.0)], vec![7]),
    ];
    for batch in &tables {
        for multiplier in [0.0, 0.5, 1.5, 3.0] {
            for (name, report) in detect_outliers_in_batch(batch, multiplier)? {
                let s = report.statistics;
                assert!(
                    s.lower_bound <= s.q1 && s.q1 <= s.q3 && s.q3 <= s.upper_bound,
                    "column {} with multiplier {}: {:?}",
                    name,
                    multiplier,
                    s
                );
            }
        }
    }
    Ok(())
}

#[test]
fn test_column_statistics_errors() {
    let batch = example_batch();
    let missing = column_statistics(&batch, "absent", DEFAULT_MULTIPLIER);
    assert!(matches!(missing, Err(TabPrepError::MissingColumn(_))));

    let non_numeric = column_statistics(&batch, "label", DEFAULT_MULTIPLIER);
    assert!(matches!(non_numeric, Err(TabPrepError::InvalidParameter(_))));

    let negative = detect_outliers_in_batch(&batch, -1.0);
    assert!(matches!(negative, Err(TabPrepError::InvalidParameter(_))));
}
