use anyhow::Result;
use attendance_recon::{
    config::DEFAULT_DEST_PATH,
    report::{self, Granularity, ReportFilter, ReportQuery, DEFAULT_TOP_N},
    store::{load_snapshot, CanonicalSnapshot},
};
use clap::Parser;
use serde::Serialize;
use std::{convert::Infallible, env, path::PathBuf, sync::Arc};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{Json, Reply, WithStatus},
    Filter,
};

#[derive(Parser)]
#[command(author, version, about = "Read-only HTTP reports over the canonical attendance table")]
struct Args {
    #[arg(long, env = "RECON_DEST_PATH", default_value = DEFAULT_DEST_PATH)]
    artifact: PathBuf,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: Option<String>,
}

fn error_reply(status: StatusCode, error: &str, details: Option<String>) -> WithStatus<Json> {
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse {
            error: error.to_string(),
            details,
        }),
        status,
    )
}

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "attendance-report-server"
    })))
}

async fn catalog() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&report::list_reports()))
}

/// Load the artifact fresh and build one report from it on the blocking pool.
async fn run_report<T, F>(
    artifact: Arc<PathBuf>,
    query: ReportQuery,
    build: F,
) -> Result<WithStatus<Json>, Infallible>
where
    T: Serialize + Send + 'static,
    F: FnOnce(&CanonicalSnapshot, &ReportQuery, &ReportFilter) -> T + Send + 'static,
{
    let filter = match query.filter() {
        Ok(f) => f,
        Err(e) => {
            return Ok(error_reply(
                StatusCode::BAD_REQUEST,
                "invalid query parameter",
                Some(format!("{e:#}")),
            ))
        }
    };
    if !artifact.is_file() {
        warn!(path = %artifact.display(), "canonical artifact missing");
        return Ok(error_reply(
            StatusCode::SERVICE_UNAVAILABLE,
            "canonical data not available",
            Some(format!("no artifact at {}; run the cleaner first", artifact.display())),
        ));
    }

    let built = tokio::task::spawn_blocking(move || -> Result<T> {
        let snap = load_snapshot(&artifact)?;
        Ok(build(&snap, &query, &filter))
    })
    .await;

    match built {
        Ok(Ok(body)) => Ok(warp::reply::with_status(warp::reply::json(&body), StatusCode::OK)),
        Ok(Err(e)) => {
            warn!(error = %format!("{e:#}"), "failed to load canonical artifact");
            Ok(error_reply(
                StatusCode::SERVICE_UNAVAILABLE,
                "canonical data not available",
                Some(format!("{e:#}")),
            ))
        }
        Err(e) => Ok(error_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            "report failed",
            Some(e.to_string()),
        )),
    }
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let reply = if err.is_not_found() {
        error_reply(StatusCode::NOT_FOUND, "not found", None)
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        error_reply(StatusCode::BAD_REQUEST, "invalid query parameter", Some(e.to_string()))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "method not allowed", None)
    } else {
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "unhandled rejection", Some(format!("{err:?}")))
    };
    Ok(reply)
}

fn with_artifact(
    artifact: Arc<PathBuf>,
) -> impl Filter<Extract = (Arc<PathBuf>,), Error = Infallible> + Clone {
    warp::any().map(move || artifact.clone())
}

fn report_input(
    artifact: Arc<PathBuf>,
) -> impl Filter<Extract = (Arc<PathBuf>, ReportQuery), Error = Rejection> + Clone {
    warp::get()
        .and(with_artifact(artifact))
        .and(warp::query::<ReportQuery>())
}

fn routes(artifact: Arc<PathBuf>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path::end().and(warp::get()).and_then(health_check);
    let list = warp::path!("reports").and(warp::get()).and_then(catalog);

    let attendance = warp::path!("reports" / "attendance")
        .and(report_input(artifact.clone()))
        .and_then(|a, q| run_report(a, q, |s, _, f| report::attendance(s, f)));
    let all_attendance = warp::path!("reports" / "attendance" / "all")
        .and(report_input(artifact.clone()))
        .and_then(|a, q| run_report(a, q, |s, _, _| report::all_attendance(s)));
    let summary = warp::path!("reports" / "overtime-summary")
        .and(report_input(artifact.clone()))
        .and_then(|a, q| run_report(a, q, |s, _, f| report::overtime_summary(s, f)));
    let department = warp::path!("reports" / "department-overtime")
        .and(report_input(artifact.clone()))
        .and_then(|a, q| run_report(a, q, |s, _, f| report::department_overtime(s, f)));
    let department_cmp = warp::path!("reports" / "overtime-department-comparison")
        .and(report_input(artifact.clone()))
        .and_then(|a, q| run_report(a, q, |s, _, f| report::department_overtime_comparison(s, f)));
    let employee_cmp = warp::path!("reports" / "overtime-employee-comparison")
        .and(report_input(artifact.clone()))
        .and_then(|a, q| run_report(a, q, |s, _, f| report::employee_overtime_comparison(s, f)));
    let month_cmp = warp::path!("reports" / "overtime-month-comparison")
        .and(report_input(artifact.clone()))
        .and_then(|a, q| run_report(a, q, |s, _, f| report::overtime_month_comparison(s, f)));
    let trends = warp::path!("reports" / "overtime-trends")
        .and(report_input(artifact.clone()))
        .and_then(|a, q| {
            run_report(a, q, |s, q: &ReportQuery, f| {
                report::overtime_trends(s, f, Granularity::parse(q.granularity.as_deref()))
            })
        });
    let top = warp::path!("reports" / "top-overtime-employees")
        .and(report_input(artifact.clone()))
        .and_then(|a, q| {
            run_report(a, q, |s, q: &ReportQuery, f| {
                report::top_overtime_employees(s, f, q.top_n.unwrap_or(DEFAULT_TOP_N))
            })
        });
    let exceptions = warp::path!("reports" / "overtime-exceptions")
        .and(report_input(artifact.clone()))
        .and_then(|a, q| {
            run_report(a, q, |s, q: &ReportQuery, f| {
                report::overtime_exceptions(s, f, q.threshold_hours)
            })
        });
    let weekly = warp::path!("reports" / "overtime-weekly-summary")
        .and(report_input(artifact))
        .and_then(|a, q| run_report(a, q, |s, _, f| report::overtime_weekly_summary(s, f)));

    health
        .or(list)
        .or(attendance)
        .or(all_attendance)
        .or(summary)
        .or(department)
        .or(department_cmp)
        .or(employee_cmp)
        .or(month_cmp)
        .or(trends)
        .or(top)
        .or(exceptions)
        .or(weekly)
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .init();

    let args = Args::parse();
    info!(artifact = %args.artifact.display(), "starting report server");
    if !args.artifact.is_file() {
        warn!(artifact = %args.artifact.display(), "no artifact yet; reports return 503 until the cleaner runs");
    }

    let app = routes(Arc::new(args.artifact)).recover(handle_rejection);
    info!("listening on http://0.0.0.0:{}", args.port);
    warp::serve(app).run(([0, 0, 0, 0], args.port)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const ARTIFACT: &str = "employee_date_id,employee_id,date,department,day_type,exception,total_ot\n\
                            A1_2025-07-01,A1,2025-07-01,Engineering,Working Day,Lateness,2\n\
                            A1_2025-07-02,A1,2025-07-02,Engineering,Working Day,,0\n\
                            A2_2025-07-01,A2,2025-07-01,Sales,Working Day,,3\n";

    fn fixture() -> Result<(tempfile::TempDir, Arc<PathBuf>)> {
        let dir = tempdir()?;
        let path = dir.path().join("cleaned.csv");
        fs::write(&path, ARTIFACT)?;
        Ok((dir, Arc::new(path)))
    }

    async fn get(artifact: Arc<PathBuf>, path: &str) -> (StatusCode, serde_json::Value) {
        let resp = warp::test::request()
            .method("GET")
            .path(path)
            .reply(&routes(artifact).recover(handle_rejection))
            .await;
        let body = serde_json::from_slice(resp.body()).unwrap_or(serde_json::Value::Null);
        (resp.status(), body)
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = get(Arc::new(PathBuf::from("missing.csv")), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn lists_every_report() {
        let (status, body) = get(Arc::new(PathBuf::from("missing.csv")), "/reports").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reports"].as_array().map(Vec::len), Some(11));
    }

    #[tokio::test]
    async fn filtered_attendance() -> Result<()> {
        let (_dir, artifact) = fixture()?;
        let (status, body) = get(artifact, "/reports/attendance?department=sales").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["attendance"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["attendance"][0]["employee_id"], "A2");
        Ok(())
    }

    #[tokio::test]
    async fn weekly_summary_over_http() -> Result<()> {
        let (_dir, artifact) = fixture()?;
        let (status, body) = get(
            artifact,
            "/reports/overtime-weekly-summary?employee_ids=A1,A2&start_date=2025-07-01&end_date=2025-07-31",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["columns"], serde_json::json!(["employee_id", "2025-W27"]));
        assert_eq!(body["overtime_weekly_summary"][0]["weeks"]["2025-W27"], 1);
        Ok(())
    }

    #[tokio::test]
    async fn top_n_and_granularity_are_passed_through() -> Result<()> {
        let (_dir, artifact) = fixture()?;
        let (_, top) = get(artifact.clone(), "/reports/top-overtime-employees?top_n=1").await;
        assert_eq!(top["top_overtime_employees"][0]["employee_id"], "A2");
        assert_eq!(top["top_overtime_employees"].as_array().map(Vec::len), Some(1));

        let (_, trends) = get(artifact, "/reports/overtime-trends?granularity=monthly").await;
        assert_eq!(trends["overtime_trends"][0]["date"], "2025-07");
        assert_eq!(trends["overtime_trends"][0]["total_overtime_hours"], 5.0);
        Ok(())
    }

    #[tokio::test]
    async fn bad_date_is_a_client_error() -> Result<()> {
        let (_dir, artifact) = fixture()?;
        let (status, body) = get(artifact, "/reports/overtime-summary?start_date=July").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid query parameter");
        Ok(())
    }

    #[tokio::test]
    async fn missing_artifact_is_unavailable() {
        let (status, body) = get(
            Arc::new(PathBuf::from("/no/such/cleaned.csv")),
            "/reports/department-overtime",
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "canonical data not available");
    }
}
