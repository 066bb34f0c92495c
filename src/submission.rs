use crate::config::CollectionPaths;
use crate::errors::SubmitError;
use crate::models::{
    DailyForm, FieldInput, Line, MachineReading, NewDailyReading, NewWeeklyReading, WeeklyForm,
};
use crate::store::{Document, DocumentStore, to_fields};
use chrono::{Datelike, Duration, NaiveDate};
use tracing::{info, warn};

pub const SAVED_MESSAGE: &str = "Registro guardado correctamente.";
pub const MISSING_FIELDS: &str = "Por favor, completa todos los campos.";
pub const MISSING_WEEK: &str = "Por favor, selecciona la semana.";
pub const NO_POSITIVE_READINGS: &str = "Introduce al menos un consumo mayor que 0.";

fn required(field: &Option<FieldInput>) -> Option<String> {
    field.as_ref().and_then(FieldInput::text)
}

fn parse_line(raw: &str) -> Result<Line, SubmitError> {
    raw.parse::<u8>()
        .ok()
        .and_then(|number| Line::try_from(number).ok())
        .ok_or_else(|| SubmitError::validation(format!("Línea no válida: {raw}")))
}

fn parse_date(raw: &str) -> Result<NaiveDate, SubmitError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| SubmitError::validation(format!("Fecha no válida: {raw}")))
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_amount(label: &str, raw: &str) -> Result<f64, SubmitError> {
    match parse_number(raw) {
        Some(value) if value >= 0.0 => Ok(value),
        _ => Err(SubmitError::validation(format!(
            "{label} debe ser un número mayor o igual que 0."
        ))),
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Checks a daily form. Any blank field rejects the whole submission.
pub fn validate_daily(form: &DailyForm) -> Result<NewDailyReading, SubmitError> {
    let (Some(date), Some(line), Some(water), Some(oil_total), Some(oil_partial)) = (
        required(&form.date),
        required(&form.line),
        required(&form.water_consumption),
        required(&form.oil_consumption_total),
        required(&form.oil_consumption_partial),
    ) else {
        return Err(SubmitError::validation(MISSING_FIELDS));
    };

    Ok(NewDailyReading {
        date: parse_date(&date)?,
        line: parse_line(&line)?,
        water_consumption: parse_amount("El consumo de agua", &water)?,
        oil_consumption_total: parse_amount("El consumo de aceite total", &oil_total)?,
        oil_consumption_partial: parse_amount("El consumo de aceite parcial", &oil_partial)?,
    })
}

/// Checks a weekly form. Blank and non-positive machine entries are
/// dropped; at least one must remain.
pub fn validate_weekly(form: &WeeklyForm) -> Result<NewWeeklyReading, SubmitError> {
    let Some(week) = required(&form.week_start_date) else {
        return Err(SubmitError::validation(MISSING_WEEK));
    };
    let Some(line) = required(&form.line) else {
        return Err(SubmitError::validation(MISSING_FIELDS));
    };
    let week_start_date = week_start(parse_date(&week)?);
    let line = parse_line(&line)?;

    let mut readings = Vec::new();
    for (key, value) in &form.consumptions_by_machine {
        let machine_id = key
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|id| line.has_machine(*id))
            .ok_or_else(|| {
                SubmitError::validation(format!(
                    "La máquina {key} no pertenece a la línea {}.",
                    line.number()
                ))
            })?;

        let Some(raw) = value.text() else {
            continue;
        };
        let consumption = parse_number(&raw).ok_or_else(|| {
            SubmitError::validation(format!("Consumo no válido para BM {machine_id}: {raw}"))
        })?;
        if consumption > 0.0 {
            readings.push(MachineReading {
                machine_id,
                consumption,
            });
        }
    }

    if readings.is_empty() {
        return Err(SubmitError::validation(NO_POSITIVE_READINGS));
    }
    readings.sort_by_key(|reading| reading.machine_id);

    Ok(NewWeeklyReading {
        week_start_date,
        line,
        readings,
    })
}

pub async fn submit_daily(
    store: &dyn DocumentStore,
    paths: &CollectionPaths,
    form: &DailyForm,
) -> Result<Document, SubmitError> {
    let reading = validate_daily(form).inspect_err(|err| warn!("daily submission rejected: {err}"))?;
    let fields = to_fields(&paths.daily, &reading)?;
    let document = store.append(&paths.daily, fields).await?;
    info!(
        id = %document.id,
        date = %reading.date,
        line = reading.line.number(),
        "daily reading stored"
    );
    Ok(document)
}

pub async fn submit_weekly(
    store: &dyn DocumentStore,
    paths: &CollectionPaths,
    form: &WeeklyForm,
) -> Result<Document, SubmitError> {
    let reading =
        validate_weekly(form).inspect_err(|err| warn!("weekly submission rejected: {err}"))?;
    let fields = to_fields(&paths.weekly, &reading)?;
    let document = store.append(&paths.weekly, fields).await?;
    info!(
        id = %document.id,
        week = %reading.week_start_date,
        line = reading.line.number(),
        machines = reading.readings.len(),
        "weekly reading stored"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::store::{CancelHandle, LocalStore, SnapshotCallback};
    use async_trait::async_trait;
    use serde_json::{Map, Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn daily_form(date: &str, line: &str, water: &str, total: &str, partial: &str) -> DailyForm {
        DailyForm {
            date: Some(date.into()),
            line: Some(line.into()),
            water_consumption: Some(water.into()),
            oil_consumption_total: Some(total.into()),
            oil_consumption_partial: Some(partial.into()),
        }
    }

    fn weekly_form(week: &str, line: &str, entries: &[(&str, &str)]) -> WeeklyForm {
        WeeklyForm {
            week_start_date: Some(week.into()),
            line: Some(line.into()),
            consumptions_by_machine: entries
                .iter()
                .map(|(machine, value)| (machine.to_string(), (*value).into()))
                .collect(),
        }
    }

    fn message(err: SubmitError) -> String {
        assert!(err.is_validation(), "expected validation error, got {err}");
        err.to_string()
    }

    /// Counts writes and fails every one of them.
    #[derive(Default)]
    struct RejectingStore {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for RejectingStore {
        fn subscribe(&self, _collection: &str, _on_update: SnapshotCallback) -> CancelHandle {
            unreachable!("submission never subscribes")
        }

        async fn append(
            &self,
            _collection: &str,
            _fields: Map<String, Value>,
        ) -> Result<Document, StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Rejected("network unreachable".into()))
        }
    }

    #[test]
    fn daily_fields_are_coerced() {
        let reading = validate_daily(&daily_form("2024-01-05", "1", "100", "40.5", " 3 ")).unwrap();
        assert_eq!(reading.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(reading.line, Line::One);
        assert_eq!(reading.water_consumption, 100.0);
        assert_eq!(reading.oil_consumption_total, 40.5);
        assert_eq!(reading.oil_consumption_partial, 3.0);
    }

    #[test]
    fn any_blank_daily_field_is_rejected() {
        let full = daily_form("2024-01-05", "1", "100", "40", "3");
        let blanks: [fn(&mut DailyForm); 5] = [
            |f| f.date = None,
            |f| f.line = Some("".into()),
            |f| f.water_consumption = Some("  ".into()),
            |f| f.oil_consumption_total = None,
            |f| f.oil_consumption_partial = Some("".into()),
        ];
        for blank in blanks {
            let mut form = full.clone();
            blank(&mut form);
            assert_eq!(message(validate_daily(&form).unwrap_err()), MISSING_FIELDS);
        }
    }

    #[test]
    fn daily_rejects_bad_values() {
        assert!(validate_daily(&daily_form("2024-01-05", "3", "1", "1", "1")).is_err());
        assert!(validate_daily(&daily_form("05/01/2024", "1", "1", "1", "1")).is_err());
        assert!(validate_daily(&daily_form("2024-01-05", "1", "abc", "1", "1")).is_err());
        assert!(validate_daily(&daily_form("2024-01-05", "1", "-4", "1", "1")).is_err());
        assert!(validate_daily(&daily_form("2024-01-05", "1", "NaN", "1", "1")).is_err());
        assert!(validate_daily(&daily_form("2024-01-05", "2", "0", "0", "0")).is_ok());
    }

    #[test]
    fn weekly_filters_blank_and_non_positive() {
        let reading = validate_weekly(&weekly_form(
            "2024-01-08",
            "1",
            &[("11", "5"), ("12", ""), ("13", "0"), ("14", "-2"), ("18", "2.5")],
        ))
        .unwrap();
        assert_eq!(
            reading.readings,
            vec![
                MachineReading { machine_id: 11, consumption: 5.0 },
                MachineReading { machine_id: 18, consumption: 2.5 },
            ]
        );
    }

    #[test]
    fn weekly_all_blank_or_zero_is_rejected() {
        let form = weekly_form("2024-01-08", "2", &[("21", ""), ("22", "0"), ("23", " ")]);
        assert_eq!(message(validate_weekly(&form).unwrap_err()), NO_POSITIVE_READINGS);
    }

    #[test]
    fn weekly_requires_week() {
        let form = weekly_form("", "1", &[("11", "5")]);
        assert_eq!(message(validate_weekly(&form).unwrap_err()), MISSING_WEEK);
    }

    #[test]
    fn weekly_rejects_machine_from_other_line() {
        let form = weekly_form("2024-01-08", "1", &[("21", "5")]);
        assert!(validate_weekly(&form).unwrap_err().is_validation());
    }

    #[test]
    fn week_is_normalised_to_monday() {
        let reading = validate_weekly(&weekly_form("2024-01-11", "2", &[("21", "1")])).unwrap();
        assert_eq!(reading.week_start_date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
    }

    #[tokio::test]
    async fn accepted_daily_is_written_with_store_fields() {
        let store = LocalStore::in_memory();
        let paths = CollectionPaths::for_namespace("test");
        let doc = submit_daily(&store, &paths, &daily_form("2024-01-05", "2", "30", "5", "1"))
            .await
            .unwrap();

        let flat = serde_json::to_value(&doc).unwrap();
        assert_eq!(flat["date"], json!("2024-01-05"));
        assert_eq!(flat["line"], json!(2));
        assert_eq!(flat["waterConsumption"], json!(30.0));
        assert!(flat["createdAt"].is_string());
    }

    #[tokio::test]
    async fn accepted_weekly_is_written() {
        let store = LocalStore::in_memory();
        let paths = CollectionPaths::for_namespace("test");
        let doc = submit_weekly(&store, &paths, &weekly_form("2024-01-08", "1", &[("11", "9")]))
            .await
            .unwrap();
        assert_eq!(
            doc.fields["readings"],
            json!([{ "machineId": 11, "consumption": 9.0 }])
        );
        assert_eq!(doc.fields["weekStartDate"], json!("2024-01-08"));
    }

    #[tokio::test]
    async fn invalid_forms_never_reach_the_store() {
        let store = RejectingStore::default();
        let paths = CollectionPaths::for_namespace("test");

        let daily = submit_daily(&store, &paths, &DailyForm::default()).await;
        let weekly = submit_weekly(&store, &paths, &weekly_form("2024-01-08", "1", &[("11", "0")])).await;

        assert!(daily.unwrap_err().is_validation());
        assert!(weekly.unwrap_err().is_validation());
        assert_eq!(store.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let store = RejectingStore::default();
        let paths = CollectionPaths::for_namespace("test");
        let err = submit_daily(&store, &paths, &daily_form("2024-01-05", "1", "1", "1", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Write(StoreError::Rejected(_))));
        assert_eq!(store.attempts.load(Ordering::SeqCst), 1);
    }
}
