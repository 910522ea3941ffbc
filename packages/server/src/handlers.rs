//! HTTP handler functions for the parcel map API.

use actix_web::{HttpResponse, web};
use parcel_map_engine::{EngineError, ErrorClass, parse_bbox, parse_regions};
use parcel_map_parcel_models::{NewParcel, ParcelUpdate};
use parcel_map_server_models::{
    ApiError, ApiHealth, ApiParcelCreated, ParcelQueryParams, SearchParams, StatisticsParams,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        parcels: state.engine.len(),
    })
}

/// `GET /api/parcels`
///
/// Parcels by bounding box when `bbox` is given, otherwise by region.
pub async fn parcels(
    state: web::Data<AppState>,
    params: web::Query<ParcelQueryParams>,
) -> HttpResponse {
    let regions = parse_regions(params.regions.as_deref());

    let result = match params.bbox.as_deref() {
        Some(bbox) => parse_bbox(bbox)
            .and_then(|bbox| state.engine.by_bbox(&bbox, &regions, params.limit)),
        None => state.engine.by_region(&regions, params.limit),
    };

    match result {
        Ok(collection) => HttpResponse::Ok().json(collection),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/parcels/search`
pub async fn search(state: web::Data<AppState>, params: web::Query<SearchParams>) -> HttpResponse {
    let regions = parse_regions(params.regions.as_deref());

    match state.engine.search(&params.field, &params.value, &regions) {
        Ok(collection) => HttpResponse::Ok().json(collection),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/parcels/{parcel_id}`
pub async fn parcel_detail(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let parcel_id = path.into_inner();
    state.engine.get_detail(&parcel_id).map_or_else(
        || not_found(&parcel_id),
        |detail| HttpResponse::Ok().json(detail),
    )
}

/// `GET /api/parcels/{parcel_id}/measurements`
pub async fn parcel_measurements(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let parcel_id = path.into_inner();
    state.engine.get_measurements(&parcel_id).map_or_else(
        || not_found(&parcel_id),
        |m| HttpResponse::Ok().json(m),
    )
}

/// `POST /api/parcels`
pub async fn create_parcel(
    state: web::Data<AppState>,
    body: web::Json<NewParcel>,
) -> HttpResponse {
    match state.engine.insert(body.into_inner()) {
        Ok(handle) => HttpResponse::Created().json(ApiParcelCreated {
            message: "Parcel created successfully".to_string(),
            parcel_id: handle.parcel_id,
        }),
        Err(e) => error_response(&e),
    }
}

/// `PATCH /api/parcels/{parcel_id}`
pub async fn update_parcel(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ParcelUpdate>,
) -> HttpResponse {
    match state.engine.update(&path.into_inner(), body.into_inner()) {
        Ok(detail) => HttpResponse::Ok().json(detail),
        Err(e) => error_response(&e),
    }
}

/// `DELETE /api/parcels/{parcel_id}`
pub async fn delete_parcel(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    match state.engine.remove(&path.into_inner()) {
        Ok(handle) => HttpResponse::Ok().json(handle),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/external/regions`
pub async fn regions_summary(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.engine.regions_summary(&state.listings))
}

/// `GET /api/external/stats`
pub async fn plot_statistics(
    state: web::Data<AppState>,
    params: web::Query<StatisticsParams>,
) -> HttpResponse {
    let region = params.region.as_deref().map(str::trim).filter(|r| !r.is_empty());
    HttpResponse::Ok().json(state.engine.plot_statistics(&state.listings, region))
}

fn not_found(parcel_id: &str) -> HttpResponse {
    error_response(&EngineError::NotFound {
        parcel_id: parcel_id.to_string(),
    })
}

/// Maps an engine error to a JSON error response.
fn error_response(e: &EngineError) -> HttpResponse {
    let mut builder = match e.class() {
        ErrorClass::ClientInput => HttpResponse::BadRequest(),
        ErrorClass::NotFound => HttpResponse::NotFound(),
        ErrorClass::WriteRejected => match e {
            EngineError::DuplicateParcelId { .. } => HttpResponse::Conflict(),
            _ => HttpResponse::UnprocessableEntity(),
        },
        ErrorClass::Internal => {
            log::error!("Request failed: {e}");
            HttpResponse::InternalServerError()
        }
    };

    builder.json(ApiError {
        error: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use parcel_map_engine::{ParcelEngine, QueryLimits};
    use parcel_map_parcel_models::{Listing, ListingStatus};

    use super::*;

    fn square(parcel_id: &str, region: &str, x: f64) -> serde_json::Value {
        serde_json::json!({
            "parcel_id": parcel_id,
            "region": region,
            "area_sqm": 1000.0,
            "land_use": "Residential",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [x, 0.0],
                    [x + 0.001, 0.0],
                    [x + 0.001, 0.001],
                    [x, 0.001],
                    [x, 0.0]
                ]]
            }
        })
    }

    fn state() -> web::Data<AppState> {
        let engine = ParcelEngine::new(QueryLimits::default());
        for (i, (id, region)) in [("DSM001", "Dar es Salaam"), ("ARU001", "Arusha")]
            .into_iter()
            .enumerate()
        {
            #[allow(clippy::cast_precision_loss)]
            let parcel = serde_json::from_value(square(id, region, i as f64)).unwrap();
            engine.insert(parcel).unwrap();
        }

        web::Data::new(AppState {
            engine: Arc::new(engine),
            listings: Arc::new(vec![Listing {
                parcel: 1,
                title: "Msasani plot".to_string(),
                price: 50_000_000.0,
                featured: true,
                status: ListingStatus::Active,
            }]),
        })
    }

    macro_rules! app {
        () => {
            test::init_service(App::new().app_data(state()).configure(crate::routes)).await
        };
    }

    #[actix_web::test]
    async fn lists_parcels_by_region() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/parcels?regions=Arusha")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["type"], "FeatureCollection");
        assert_eq!(body["total"], 1);
        assert_eq!(body["features"][0]["id"], "ARU001");
    }

    #[actix_web::test]
    async fn bbox_query_and_malformed_bbox() {
        let app = app!();

        let req = test::TestRequest::get()
            .uri("/api/parcels?bbox=-0.5,-0.5,0.0005,0.0005")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["features"][0]["id"], "DSM001");

        for bad in ["1,2,3", "2,0,1,1", "a,b,c,d"] {
            let req = test::TestRequest::get()
                .uri(&format!("/api/parcels?bbox={bad}"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "bbox {bad}");
        }
    }

    #[actix_web::test]
    async fn search_and_unknown_field() {
        let app = app!();

        let req = test::TestRequest::get()
            .uri("/api/parcels/search?field=parcel_id&value=dsm")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);

        let req = test::TestRequest::get()
            .uri("/api/parcels/search?field=zoning&value=R1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn detail_measurements_and_not_found() {
        let app = app!();

        let req = test::TestRequest::get().uri("/api/parcels/DSM001").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["parcel_id"], "DSM001");
        assert_eq!(body["area_sqm"], 1000.0);
        assert!(body["measurements"]["area_hectares"].as_f64().unwrap() > 0.0);

        let req = test::TestRequest::get()
            .uri("/api/parcels/DSM001/measurements")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["stored_area_sqm"], 1000.0);

        for uri in ["/api/parcels/NOPE", "/api/parcels/NOPE/measurements"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[actix_web::test]
    async fn create_duplicate_and_invalid() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/api/parcels")
            .set_json(square("MWZ001", "Mwanza", 5.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["parcel_id"], "MWZ001");
        assert_eq!(body["message"], "Parcel created successfully");

        let req = test::TestRequest::post()
            .uri("/api/parcels")
            .set_json(square("DSM001", "Dar es Salaam", 7.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Parcel ID already exists: DSM001");

        let mut bowtie = square("BAD001", "Dodoma", 9.0);
        bowtie["geometry"]["coordinates"] =
            serde_json::json!([[[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]]);
        let req = test::TestRequest::post()
            .uri("/api/parcels")
            .set_json(bowtie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn update_attributes() {
        let app = app!();

        let req = test::TestRequest::patch()
            .uri("/api/parcels/ARU001")
            .set_json(serde_json::json!({"owner_name": "Baraka Lema"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["owner_name"], "Baraka Lema");
        assert!(!body["updated_at"].is_null());
    }

    #[actix_web::test]
    async fn delete_removes_from_bbox_results() {
        let app = app!();

        let req = test::TestRequest::delete().uri("/api/parcels/DSM001").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["parcel_id"], "DSM001");

        let req = test::TestRequest::get()
            .uri("/api/parcels?bbox=-0.5,-0.5,0.0005,0.0005")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 0);

        let req = test::TestRequest::delete().uri("/api/parcels/DSM001").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn external_statistics() {
        let app = app!();

        let req = test::TestRequest::get().uri("/api/external/regions").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["region"], "Dar es Salaam");
        assert_eq!(body[0]["available_plots"], 1);

        let req = test::TestRequest::get()
            .uri("/api/external/stats?region=Arusha")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!({"total_plots": 0, "region": "Arusha"}));

        let req = test::TestRequest::get()
            .uri("/api/external/stats")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_plots"], 1);
        assert_eq!(body["featured_plots"], 1);
        assert_eq!(body["land_use_distribution"]["Residential"], 1);

        let req = test::TestRequest::get()
            .uri("/api/external/statistics")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
