use chrono::{DateTime, NaiveDateTime, Utc};
use csv_async::{AsyncReaderBuilder, StringRecord};
use futures::StreamExt;
use tokio::io::AsyncRead;

use crate::{
    error::DecodeError,
    schema::{Column, ColumnType, Schema},
    sink::{PageSink, TypedValue},
};

/// Text values accepted as boolean true; anything else decodes to false.
pub const TRUE_STRINGS: &[&str] = &[
    "true", "True", "TRUE", "yes", "Yes", "YES", "t", "T", "y", "Y", "on", "On", "ON", "1",
];

/// Timestamp pattern applied when a column declares no `format`.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

/// Streams delimited text from `reader` into `sink` as typed records.
///
/// Quoted fields may contain the delimiter or embedded newlines; doubled
/// quotes escape a literal quote. An empty field is the null sentinel. Every
/// record must carry exactly one field per schema column. Returns the number
/// of records committed; any structural or per-field failure aborts the
/// stream with no partial record emitted.
pub async fn decode_stream<R>(
    reader: R,
    schema: &Schema,
    sink: &mut dyn PageSink,
) -> Result<usize, DecodeError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut csv = AsyncReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .create_reader(reader);
    let mut records = csv.records();
    let mut committed = 0usize;
    while let Some(record) = records.next().await {
        decode_record(&record?, schema, sink)?;
        committed += 1;
    }
    sink.finish();
    Ok(committed)
}

fn decode_record(
    record: &StringRecord,
    schema: &Schema,
    sink: &mut dyn PageSink,
) -> Result<(), DecodeError> {
    if record.len() != schema.len() {
        return Err(DecodeError::RecordShape {
            expected: schema.len(),
            actual: record.len(),
        });
    }

    sink.begin_record();
    for (index, column) in schema.columns().iter().enumerate() {
        let raw = record.get(index).unwrap_or_default();
        if raw.is_empty() {
            sink.set_null(index);
        } else {
            sink.set_value(index, decode_field(column, raw)?);
        }
    }
    sink.commit_record();
    Ok(())
}

fn decode_field(column: &Column, raw: &str) -> Result<TypedValue, DecodeError> {
    let value = match column.column_type {
        ColumnType::Boolean => TypedValue::Boolean(TRUE_STRINGS.contains(&raw)),
        ColumnType::Long => TypedValue::Long(
            raw.parse::<i64>()
                .map_err(|err| field_parse(column, raw, err))?,
        ),
        ColumnType::Double => TypedValue::Double(
            raw.parse::<f64>()
                .map_err(|err| field_parse(column, raw, err))?,
        ),
        ColumnType::String => TypedValue::String(raw.to_string()),
        ColumnType::Timestamp => {
            let format = column.format.as_deref().unwrap_or(DEFAULT_TIMESTAMP_FORMAT);
            TypedValue::Timestamp(
                parse_timestamp(raw, format).map_err(|err| field_parse(column, raw, err))?,
            )
        }
        ColumnType::Json => TypedValue::Json(
            serde_json::from_str(raw).map_err(|err| field_parse(column, raw, err))?,
        ),
    };
    Ok(value)
}

fn field_parse(column: &Column, value: &str, err: impl std::fmt::Display) -> DecodeError {
    DecodeError::FieldParse {
        column: column.name.clone(),
        column_type: column.column_type,
        value: value.to_string(),
        message: err.to_string(),
    }
}

/// Parses `raw` with a strftime pattern; patterns without a UTC offset are
/// interpreted as UTC, matching the protocol's default timezone.
fn parse_timestamp(raw: &str, format: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_str(raw, format) {
        Ok(aware) => Ok(aware.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(raw, format).map(|naive| naive.and_utc()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::sink::MemorySink;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", ColumnType::Long),
            Column::new("ok", ColumnType::Boolean),
            Column::new("ts", ColumnType::Timestamp).with_format("%Y-%m-%dT%H:%M:%SZ"),
        ])
    }

    async fn decode(input: &str, schema: &Schema) -> Result<MemorySink, DecodeError> {
        let mut sink = MemorySink::new();
        decode_stream(input.as_bytes(), schema, &mut sink).await?;
        Ok(sink)
    }

    #[tokio::test]
    async fn decodes_one_typed_record_per_line() {
        let schema = schema();
        let sink = decode("42,Yes,2024-01-01T00:00:00Z\n7,no,2024-06-30T12:30:00Z\n", &schema)
            .await
            .unwrap();

        assert!(sink.is_finished());
        assert_eq!(
            sink.rows(),
            &[
                vec![
                    Some(TypedValue::Long(42)),
                    Some(TypedValue::Boolean(true)),
                    Some(TypedValue::Timestamp(
                        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    )),
                ],
                vec![
                    Some(TypedValue::Long(7)),
                    Some(TypedValue::Boolean(false)),
                    Some(TypedValue::Timestamp(
                        Utc.with_ymd_and_hms(2024, 6, 30, 12, 30, 0).unwrap()
                    )),
                ],
            ]
        );
    }

    #[tokio::test]
    async fn empty_fields_are_null() {
        let schema = Schema::new(vec![
            Column::new("a", ColumnType::String),
            Column::new("b", ColumnType::Boolean),
            Column::new("c", ColumnType::Long),
        ]);
        let sink = decode("x,,\n", &schema).await.unwrap();
        assert_eq!(
            sink.rows(),
            &[vec![Some(TypedValue::String("x".into())), None, None]]
        );
    }

    #[tokio::test]
    async fn short_record_fails_with_expected_and_actual() {
        let schema = schema();
        let err = decode("42,Yes\n", &schema).await.unwrap_err();
        match err {
            DecodeError::RecordShape { expected, actual } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn no_record_is_emitted_for_a_malformed_line() {
        let schema = schema();
        let mut sink = MemorySink::new();
        let result =
            decode_stream("42,Yes,2024-01-01T00:00:00Z\n1,t\n".as_bytes(), &schema, &mut sink)
                .await;
        assert!(result.is_err());
        assert_eq!(sink.rows().len(), 1);
    }

    #[tokio::test]
    async fn non_truthy_boolean_is_false_not_an_error() {
        let schema = Schema::new(vec![Column::new("ok", ColumnType::Boolean)]);
        let sink = decode("maybe\non\nON\n1\n", &schema).await.unwrap();
        assert_eq!(
            sink.rows(),
            &[
                vec![Some(TypedValue::Boolean(false))],
                vec![Some(TypedValue::Boolean(true))],
                vec![Some(TypedValue::Boolean(true))],
                vec![Some(TypedValue::Boolean(true))],
            ]
        );
    }

    #[tokio::test]
    async fn quoted_fields_keep_delimiters_and_newlines() {
        let schema = Schema::new(vec![
            Column::new("s", ColumnType::String),
            Column::new("j", ColumnType::Json),
        ]);
        let sink = decode("\"a,b\nc\",\"{\"\"k\"\": 1}\"\n", &schema).await.unwrap();
        assert_eq!(
            sink.rows(),
            &[vec![
                Some(TypedValue::String("a,b\nc".into())),
                Some(TypedValue::Json(serde_json::json!({"k": 1}))),
            ]]
        );
    }

    #[tokio::test]
    async fn bad_long_names_the_column() {
        let schema = Schema::new(vec![Column::new("count", ColumnType::Long)]);
        let err = decode("12x\n", &schema).await.unwrap_err();
        match err {
            DecodeError::FieldParse {
                column,
                column_type,
                value,
                ..
            } => {
                assert_eq!(column, "count");
                assert_eq!(column_type, ColumnType::Long);
                assert_eq!(value, "12x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn bad_timestamp_and_json_fail_per_field() {
        let ts = Schema::new(vec![
            Column::new("at", ColumnType::Timestamp).with_format("%Y-%m-%d")
        ]);
        assert!(matches!(
            decode("01/02/2024\n", &ts).await.unwrap_err(),
            DecodeError::FieldParse { .. }
        ));

        let js = Schema::new(vec![Column::new("doc", ColumnType::Json)]);
        assert!(matches!(
            decode("{not json}\n", &js).await.unwrap_err(),
            DecodeError::FieldParse { .. }
        ));
    }

    #[tokio::test]
    async fn double_parses_decimal_and_exponent() {
        let schema = Schema::new(vec![Column::new("f", ColumnType::Double)]);
        let sink = decode("0.25\n1e3\n", &schema).await.unwrap();
        assert_eq!(
            sink.rows(),
            &[
                vec![Some(TypedValue::Double(0.25))],
                vec![Some(TypedValue::Double(1000.0))],
            ]
        );
    }

    #[tokio::test]
    async fn default_timestamp_format_accepts_offset_and_fraction() {
        let schema = Schema::new(vec![Column::new("at", ColumnType::Timestamp)]);
        let sink = decode("2019-01-01 00:00:00.500 +0900\n", &schema).await.unwrap();
        let expected = Utc.with_ymd_and_hms(2018, 12, 31, 15, 0, 0).unwrap()
            + chrono::Duration::milliseconds(500);
        assert_eq!(
            sink.rows(),
            &[vec![Some(TypedValue::Timestamp(expected))]]
        );
    }

    #[tokio::test]
    async fn offsetless_format_assumes_utc() {
        let schema = Schema::new(vec![
            Column::new("at", ColumnType::Timestamp).with_format("%Y-%m-%d %H:%M:%S")
        ]);
        let sink = decode("2019-01-01 00:00:00\n", &schema).await.unwrap();
        assert_eq!(
            sink.rows(),
            &[vec![Some(TypedValue::Timestamp(
                Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap()
            ))]]
        );
    }
}
