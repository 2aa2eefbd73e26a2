use chrono::{DateTime, Utc};

/// One decoded field value, aligned to the declared column type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    Boolean(bool),
    Long(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

/// Columnar record consumer at the host boundary.
///
/// The decoder calls `begin_record`, then one `set_value`/`set_null` per
/// column, then `commit_record`, strictly in input order; `finish` is called
/// once a task's stream ends. A record whose decoding fails is never
/// committed.
pub trait PageSink {
    fn begin_record(&mut self);
    fn set_value(&mut self, column: usize, value: TypedValue);
    fn set_null(&mut self, column: usize);
    fn commit_record(&mut self);
    fn finish(&mut self);
}

/// Reference sink materializing committed rows in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    current: Vec<Option<TypedValue>>,
    rows: Vec<Vec<Option<TypedValue>>>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Vec<Option<TypedValue>>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Option<TypedValue>>> {
        self.rows
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn put(&mut self, column: usize, value: Option<TypedValue>) {
        if column >= self.current.len() {
            self.current.resize(column + 1, None);
        }
        self.current[column] = value;
    }
}

impl PageSink for MemorySink {
    fn begin_record(&mut self) {
        self.current.clear();
    }

    fn set_value(&mut self, column: usize, value: TypedValue) {
        self.put(column, Some(value));
    }

    fn set_null(&mut self, column: usize) {
        self.put(column, None);
    }

    fn commit_record(&mut self) {
        self.rows.push(std::mem::take(&mut self.current));
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_committed_rows_in_order() {
        let mut sink = MemorySink::new();
        sink.begin_record();
        sink.set_value(0, TypedValue::Long(1));
        sink.set_null(1);
        sink.commit_record();
        sink.begin_record();
        sink.set_value(0, TypedValue::Long(2));
        sink.set_value(1, TypedValue::String("x".into()));
        sink.commit_record();
        sink.finish();

        assert!(sink.is_finished());
        assert_eq!(
            sink.rows(),
            &[
                vec![Some(TypedValue::Long(1)), None],
                vec![
                    Some(TypedValue::Long(2)),
                    Some(TypedValue::String("x".into()))
                ],
            ]
        );
    }

    #[test]
    fn uncommitted_record_is_dropped() {
        let mut sink = MemorySink::new();
        sink.begin_record();
        sink.set_value(0, TypedValue::Boolean(true));
        // no commit
        sink.begin_record();
        sink.set_value(0, TypedValue::Boolean(false));
        sink.commit_record();

        assert_eq!(sink.rows(), &[vec![Some(TypedValue::Boolean(false))]]);
    }
}
