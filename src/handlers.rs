use crate::aggregate::{
    DAILY_HISTORY_ROWS, WEEKLY_HISTORY_ROWS, daily_history, latest_for_line, weekly_history,
};
use crate::errors::AppError;
use crate::identity::Session;
use crate::models::{
    DailyForm, DailyReading, DashboardResponse, HistoryResponse, Line, LineQuery,
    MachinesResponse, SessionResponse, SubmitResponse, WeeklyForm, WeeklyReading,
};
use crate::state::AppState;
use crate::submission::{SAVED_MESSAGE, submit_daily, submit_weekly};
use crate::ui::render_index;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        Html,
        sse::{Event, KeepAlive, Sse},
    },
    Json,
};
use futures::{Stream, StreamExt, stream};
use std::{convert::Infallible, sync::Arc};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

const LOADING: &str = "Cargando sesión...";

fn require_ready(state: &AppState) -> Result<(), AppError> {
    if state.identity.is_ready() {
        Ok(())
    } else {
        Err(AppError::unavailable(LOADING))
    }
}

pub async fn index() -> Html<String> {
    Html(render_index())
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session = state.identity.session();
    Json(SessionResponse {
        ready: session.is_some(),
        session_id: session.as_ref().map(|session| session.id.clone()),
        anonymous: session.as_ref().map(Session::is_anonymous),
    })
}

pub async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, AppError> {
    require_ready(&state)?;
    let daily = state.daily.snapshot();
    let weekly = state.weekly.snapshot();

    Ok(Json(DashboardResponse {
        daily: state.views.daily_chart(&daily).to_vec(),
        weekly: state.views.weekly_chart(&weekly).to_vec(),
        line1_week: latest_for_line(&weekly, Line::One).map(|r| r.week_start_date),
        line2_week: latest_for_line(&weekly, Line::Two).map(|r| r.week_start_date),
    }))
}

pub async fn get_daily_history(
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse<DailyReading>>, AppError> {
    require_ready(&state)?;
    let snapshot = state.daily.snapshot();
    Ok(Json(HistoryResponse {
        line1: daily_history(&snapshot, Line::One, DAILY_HISTORY_ROWS),
        line2: daily_history(&snapshot, Line::Two, DAILY_HISTORY_ROWS),
    }))
}

pub async fn get_weekly_history(
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse<WeeklyReading>>, AppError> {
    require_ready(&state)?;
    let snapshot = state.weekly.snapshot();
    Ok(Json(HistoryResponse {
        line1: weekly_history(&snapshot, Line::One, WEEKLY_HISTORY_ROWS),
        line2: weekly_history(&snapshot, Line::Two, WEEKLY_HISTORY_ROWS),
    }))
}

pub async fn get_machines(Query(query): Query<LineQuery>) -> Result<Json<MachinesResponse>, AppError> {
    let line = Line::try_from(query.line).map_err(AppError::bad_request)?;
    Ok(Json(MachinesResponse {
        line,
        machines: line.machines().collect(),
    }))
}

pub async fn post_daily(
    State(state): State<AppState>,
    Json(form): Json<DailyForm>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    require_ready(&state)?;
    let document = submit_daily(state.store.as_ref(), &state.paths, &form).await?;
    Ok(created(document.id))
}

pub async fn post_weekly(
    State(state): State<AppState>,
    Json(form): Json<WeeklyForm>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    require_ready(&state)?;
    let document = submit_weekly(state.store.as_ref(), &state.paths, &form).await?;
    Ok(created(document.id))
}

/// Pushes a `daily` or `weekly` event carrying the new record count each
/// time a snapshot is replaced.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let feed = change_feed(state.daily.changes(), state.weekly.changes()).map(|(name, count)| {
        Ok::<_, Infallible>(Event::default().event(name).data(count.to_string()))
    });

    Sse::new(feed).keep_alive(KeepAlive::default())
}

fn change_feed(
    daily: watch::Receiver<Arc<Vec<DailyReading>>>,
    weekly: watch::Receiver<Arc<Vec<WeeklyReading>>>,
) -> impl Stream<Item = (&'static str, usize)> + Send + 'static {
    let daily = WatchStream::from_changes(daily).map(|snapshot| ("daily", snapshot.len()));
    let weekly = WatchStream::from_changes(weekly).map(|snapshot| ("weekly", snapshot.len()));
    stream::select(daily, weekly)
}

fn created(id: String) -> (StatusCode, Json<SubmitResponse>) {
    (
        StatusCode::CREATED,
        Json(SubmitResponse {
            id,
            message: SAVED_MESSAGE.to_string(),
        }),
    )
}
