//! HTTP request handlers

use std::collections::HashMap;
use std::sync::Arc;
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::assessment::{self, BAND_COUNT};
use crate::inference::PredictionReport;

use super::error::{Result, ServerError};
use super::state::AppState;

// ============================================================================
// JSON API
// ============================================================================

/// POST /api/predict — JSON body `{"frequency_values": [60 floats]}`
pub async fn api_predict(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>> {
    let values = body
        .get("frequency_values")
        .ok_or_else(|| {
            ServerError::BadRequest("Missing required field: frequency_values".to_string())
        })?
        .as_array()
        .ok_or_else(|| {
            ServerError::BadRequest("frequency_values must be an array of numbers".to_string())
        })?;

    let bands: Vec<f64> = values
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                ServerError::BadRequest("frequency_values must contain only numbers".to_string())
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    let report = run_prediction(&state, &bands)?;

    let risk_factors = state
        .engine
        .as_ref()
        .map(|e| e.risk_factors())
        .unwrap_or(&[]);
    let top_factors: Vec<serde_json::Value> = risk_factors
        .iter()
        .take(5)
        .map(|f| {
            json!({
                "rank": f.rank,
                "frequency_band": f.frequency_band,
                "importance": f.importance,
                "percentage": round2(f.percentage),
            })
        })
        .collect();

    let a = &report.assessment;
    Ok(Json(json!({
        "success": true,
        "prediction": {
            "object_type": a.object_class.as_str(),
            "confidence_percent": round2(a.confidence_percent),
            "confidence_level": a.confidence_level.as_str(),
            "risk_level": a.risk_level.as_str(),
            "recommendation": a.recommendation,
        },
        "probabilities": {
            "rock": round2(a.rock_probability),
            "mine": round2(a.mine_probability),
        },
        "characteristics": {
            "object_type": a.characteristics.object_type,
            "description": a.characteristics.description,
            "typical_signals": a.characteristics.typical_signals,
            "risk_message": a.characteristics.risk_message,
        },
        "model": {
            "name": report.model_name,
            "used_backup": report.used_backup,
        },
        "top_risk_factors": top_factors,
    })))
}

/// GET /api/risk-factors
pub async fn api_risk_factors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>> {
    let engine = state.engine.as_ref().ok_or_else(|| {
        ServerError::ModelUnavailable("Models not loaded. Train a model first.".to_string())
    })?;

    let factors: Vec<serde_json::Value> = engine
        .risk_factors()
        .iter()
        .map(|f| {
            json!({
                "rank": f.rank,
                "frequency_band": f.frequency_band,
                "importance": f.importance,
                "percentage": round2(f.percentage),
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "risk_factors": factors,
        "note": "Top frequency bands that distinguish mines from rocks",
    })))
}

/// GET /api/sonar-info
pub async fn api_sonar_info() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "sonar_info": assessment::sonar_info(),
    }))
}

/// GET /health
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let models_loaded = state.models_loaded();
    let status = if models_loaded {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if models_loaded { "healthy" } else { "unhealthy" },
            "models_loaded": models_loaded,
            "application": "SONAR Rock vs Mine Prediction",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "form": "/",
                "about": "/about",
                "api_predict": "/api/predict (POST)",
                "risk_factors": "/api/risk-factors (GET)",
                "sonar_info": "/api/sonar-info (GET)",
                "health": "/health (GET)",
            },
        })),
    )
}

// ============================================================================
// Web form
// ============================================================================

/// GET / — prediction form
pub async fn index_form(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_form(&state, None))
}

/// POST / — urlencoded form fields `freq_0`..`freq_59`
pub async fn index_submit(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> Html<String> {
    let mut bands = Vec::with_capacity(BAND_COUNT);
    for i in 0..BAND_COUNT {
        let raw = match fields.get(&format!("freq_{}", i)) {
            Some(v) if !v.trim().is_empty() => v.trim(),
            _ => {
                return Html(render_form(
                    &state,
                    Some(&format!("Frequency band {} is missing.", i)),
                ));
            }
        };
        match raw.parse::<f64>() {
            Ok(v) => bands.push(v),
            Err(_) => {
                return Html(render_form(
                    &state,
                    Some(&format!("Frequency band {} is not a number: '{}'", i, raw)),
                ));
            }
        }
    }

    match run_prediction(&state, &bands) {
        Ok(report) => Html(render_result(&state, &report)),
        Err(e) => Html(render_form(&state, Some(&e.to_string()))),
    }
}

/// GET /about
pub async fn about_page() -> Html<String> {
    Html(render_about())
}

// ============================================================================
// Shared helpers
// ============================================================================

fn run_prediction(state: &AppState, bands: &[f64]) -> Result<PredictionReport> {
    let engine = state.engine.as_ref().ok_or_else(|| {
        ServerError::ModelUnavailable(
            "Models not loaded. Train a model and restart the server.".to_string(),
        )
    })?;

    let report = engine
        .predict(bands)
        .map_err(|e| match e {
            crate::SonarError::ValidationError(msg) => ServerError::BadRequest(msg),
            other => ServerError::Internal(other.to_string()),
        })?;

    info!(
        object = report.assessment.object_class.as_str(),
        confidence = %format!("{:.1}%", report.assessment.confidence_percent),
        risk = report.assessment.risk_level.as_str(),
        used_backup = report.used_backup,
        "Prediction served"
    );

    Ok(report)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ============================================================================
// Embedded HTML pages
// ============================================================================

const PAGE_STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 60rem; color: #1c2733; }
h1 { font-size: 1.5rem; } h2 { font-size: 1.15rem; margin-top: 1.5rem; }
nav a { margin-right: 1rem; }
.error { background: #fde8e8; border: 1px solid #c53030; padding: 0.75rem; border-radius: 4px; }
.bands { display: grid; grid-template-columns: repeat(6, 1fr); gap: 0.4rem; margin: 1rem 0; }
.bands label { font-size: 0.7rem; color: #556; display: block; }
.bands input { width: 100%; box-sizing: border-box; }
table { border-collapse: collapse; margin-top: 0.75rem; }
td, th { border: 1px solid #cbd5e0; padding: 0.35rem 0.7rem; text-align: left; }
.badge { display: inline-block; padding: 0.2rem 0.6rem; border-radius: 4px; color: #fff; }
.badge.red { background: #c53030; } .badge.orange { background: #dd6b20; }
.badge.green { background: #2f855a; } .badge.yellow { background: #b7791f; color: #1c2733; }
button { padding: 0.5rem 1.25rem; }
"#;

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<nav><a href="/">Prediction form</a><a href="/about">About</a><a href="/health">Health</a></nav>
{body}
</body>
</html>"#,
        title = title,
        style = PAGE_STYLE,
        body = body,
    )
}

fn render_form(state: &AppState, error: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str("<h1>SONAR Rock vs Mine Prediction</h1>");

    if !state.models_loaded() {
        body.push_str(
            "<p class=\"error\">No model is loaded. Train one with <code>sonar-detect train</code> and restart.</p>",
        );
    }
    if let Some(msg) = error {
        body.push_str(&format!("<p class=\"error\">{}</p>", html_escape(msg)));
    }

    let sonar_info = assessment::sonar_info();
    body.push_str(&format!(
        "<p>Enter the {} frequency band readings (each between 0 and 1) from the {} covering {}.</p>",
        sonar_info.frequency_bands,
        html_escape(&sonar_info.equipment),
        html_escape(&sonar_info.frequency_range),
    ));

    body.push_str("<form method=\"post\" action=\"/\"><div class=\"bands\">");
    for i in 0..BAND_COUNT {
        body.push_str(&format!(
            "<div><label for=\"freq_{i}\">band {i}</label>\
             <input id=\"freq_{i}\" name=\"freq_{i}\" type=\"number\" step=\"any\" min=\"0\" max=\"1\" value=\"0.0\" required></div>",
            i = i,
        ));
    }
    body.push_str("</div><button type=\"submit\">Classify object</button></form>");

    page("SONAR Prediction", &body)
}

fn render_result(state: &AppState, report: &PredictionReport) -> String {
    let a = &report.assessment;
    let mut body = String::new();

    body.push_str("<h1>Detection result</h1>");
    body.push_str(&format!(
        "<p><span class=\"badge {}\">{}</span> &nbsp; {}</p>",
        a.risk_color,
        html_escape(&a.prediction_text),
        html_escape(a.risk_level.as_str()),
    ));

    body.push_str("<table>");
    body.push_str(&format!(
        "<tr><th>Object type</th><td>{}</td></tr>",
        a.object_class.as_str()
    ));
    body.push_str(&format!(
        "<tr><th>Confidence</th><td>{:.2}% ({})</td></tr>",
        a.confidence_percent,
        a.confidence_level.as_str()
    ));
    body.push_str(&format!(
        "<tr><th>Rock probability</th><td>{:.2}%</td></tr>",
        a.rock_probability
    ));
    body.push_str(&format!(
        "<tr><th>Mine probability</th><td>{:.2}%</td></tr>",
        a.mine_probability
    ));
    body.push_str(&format!(
        "<tr><th>Model</th><td>{}{}</td></tr>",
        html_escape(&report.model_name),
        if report.used_backup { " (backup)" } else { "" }
    ));
    body.push_str("</table>");

    body.push_str(&format!(
        "<h2>Recommendation</h2><p>{}</p>",
        html_escape(&a.recommendation)
    ));
    body.push_str(&format!(
        "<h2>Typical signals</h2><p>{}: {}</p>",
        html_escape(&a.characteristics.description),
        html_escape(&a.characteristics.typical_signals),
    ));

    if let Some(engine) = state.engine.as_ref() {
        let factors = engine.risk_factors();
        if !factors.is_empty() {
            body.push_str("<h2>Most discriminative frequency bands</h2><table><tr><th>Rank</th><th>Band</th><th>Relative importance</th></tr>");
            for f in factors.iter().take(5) {
                body.push_str(&format!(
                    "<tr><td>{}</td><td>band {}</td><td>{:.1}%</td></tr>",
                    f.rank, f.frequency_band, f.percentage
                ));
            }
            body.push_str("</table>");
        }
    }

    body.push_str("<p><a href=\"/\">Classify another reading</a></p>");
    page("Detection result", &body)
}

fn render_about() -> String {
    let sonar_info = assessment::sonar_info();
    let mut body = String::new();

    body.push_str("<h1>About</h1>");
    body.push_str(
        "<p>This service classifies underwater sonar returns as natural rock formations \
         or mines. A scale-then-classify pipeline is trained offline on the 208-sample \
         SONAR dataset; the best model by cross-validated accuracy is serialized and \
         served here.</p>",
    );

    body.push_str("<h2>Equipment</h2><table>");
    body.push_str(&format!(
        "<tr><th>Equipment</th><td>{}</td></tr>",
        html_escape(&sonar_info.equipment)
    ));
    body.push_str(&format!(
        "<tr><th>Frequency bands</th><td>{}</td></tr>",
        sonar_info.frequency_bands
    ));
    body.push_str(&format!(
        "<tr><th>Frequency range</th><td>{}</td></tr>",
        html_escape(&sonar_info.frequency_range)
    ));
    body.push_str(&format!(
        "<tr><th>Application</th><td>{}</td></tr>",
        html_escape(&sonar_info.application)
    ));
    body.push_str("</table>");

    body.push_str("<h2>Signal characteristics</h2><table><tr><th>Group</th><th>Bands</th><th>Typical for</th></tr>");
    for (name, group) in [
        ("Low frequencies", &sonar_info.low_frequencies),
        ("Mid frequencies", &sonar_info.mid_frequencies),
        ("High frequencies", &sonar_info.high_frequencies),
    ] {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            name,
            html_escape(&group.range),
            html_escape(&group.typical_for),
        ));
    }
    body.push_str("</table>");

    body.push_str(
        "<h2>API</h2><p>POST a JSON body <code>{\"frequency_values\": [60 floats]}</code> \
         to <code>/api/predict</code>. Ranked band importances are at \
         <code>/api/risk-factors</code>, equipment data at <code>/api/sonar-info</code>.</p>",
    );

    page("About", &body)
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
