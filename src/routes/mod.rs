pub mod notes;

pub mod scores;

pub use notes::configure_notes_routes;
pub use scores::configure_scores_routes;

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test, web};
    use serde_json::{Value, json};
    use std::sync::Arc;

    use super::*;
    use crate::cache::object_cache::moka::MokaCacheWrapper;
    use crate::notes::fixtures::{self, EVAL_1, EVAL_2, MODULE, SEMESTER, STUDENT_1, STUDENT_2, UE};
    use crate::notes::{NotesSettings, NotesWriter, ResultCache};
    use crate::utils::json_error_handler;

    fn shared_state() -> (Arc<ResultCache>, Arc<NotesWriter>) {
        let cache = Arc::new(ResultCache::new(
            Arc::new(MokaCacheWrapper::with_settings(1000)),
            Arc::new(fixtures::sample_storage()),
            "DEPT",
            NotesSettings::default(),
        ));
        let writer = Arc::new(NotesWriter::new(cache.clone()));
        (cache, writer)
    }

    macro_rules! app {
        () => {{
            let (cache, writer) = shared_state();
            test::init_service(
                App::new()
                    .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                    .app_data(web::Data::new(cache))
                    .app_data(web::Data::new(writer))
                    .configure(configure_notes_routes)
                    .configure(configure_scores_routes),
            )
            .await
        }};
    }

    fn close(value: &Value, expected: f64) {
        let v = value.as_f64().unwrap_or(f64::NAN);
        assert!((v - expected).abs() < 1e-3, "{value} != {expected}");
    }

    #[actix_web::test]
    async fn test_semester_results() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/semesters/{SEMESTER}/results"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["code"], 0);
        let rows = &body["data"]["rows"]["items"];
        assert_eq!(rows[0]["student_id"], STUDENT_1);
        assert_eq!(rows[0]["rank"], "1");
        close(&rows[0]["general"], 12.667);
        close(&rows[1]["general"], 4.887);
    }

    #[actix_web::test]
    async fn test_unknown_semester_is_404() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/v1/semesters/999/results")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_student_and_module_endpoints() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/semesters/{SEMESTER}/students/{STUDENT_2}"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["rank"], "2");

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/semesters/{SEMESTER}/students/4242"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/semesters/{SEMESTER}/modules/{MODULE}/stats"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["evaluations"].as_array().map(Vec::len), Some(2));

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/semesters/{SEMESTER}/ues"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["ues"][0]["ue"]["id"], UE);
    }

    #[actix_web::test]
    async fn test_save_scores_refreshes_results() {
        let app = app!();
        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/evaluations/{EVAL_1}/scores"))
            .set_json(json!({"scores": [{"student_id": STUDENT_1, "value": "ABS"}]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["changed"], 1);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/semesters/{SEMESTER}/students/{STUDENT_1}"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        close(&body["data"]["general"], 8.667);
    }

    #[actix_web::test]
    async fn test_invalid_input_is_rejected() {
        let app = app!();
        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/evaluations/{EVAL_2}/scores"))
            .set_json(json!({"scores": [{"student_id": STUDENT_1, "value": 42}]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/modules/{MODULE}/formula"))
            .set_json(json!({"formula": "__import__('os')"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // 过深嵌套的公式被拒绝，而不是耗尽栈
        let nested = format!("{}moy{}", "(".repeat(500), ")".repeat(500));
        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/modules/{MODULE}/formula"))
            .set_json(json!({ "formula": nested }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/evaluations/{EVAL_2}/scores"))
            .set_payload("{not json")
            .insert_header(("content-type", "application/json"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_ue_formula_and_state() {
        let app = app!();
        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/semesters/{SEMESTER}/ues/{UE}/formula"))
            .set_json(json!({"formula": "moy - 1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/semesters/{SEMESTER}/students/{STUDENT_2}/state"))
            .set_json(json!({"state": "D"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/semesters/{SEMESTER}/students/{STUDENT_2}"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["state"], "D");
        assert!(body["data"]["rank"].is_null());
    }

    #[actix_web::test]
    async fn test_invalidate_endpoint() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/semesters/{SEMESTER}/invalidate"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["semesters"], json!([SEMESTER]));

        let req = test::TestRequest::post()
            .uri("/api/v1/semesters/999/invalidate")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
