use crate::{
    api::{attendance, leave_count, toggle},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use anyhow::{Result, anyhow};

pub type SubmitLimiter = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-peer limiter config. Built once at startup so every worker shares the
/// same buckets.
pub fn build_limiter(requests_per_min: u32) -> Result<SubmitLimiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid submit rate limit: {requests_per_min}/min"))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, submit_limiter: &SubmitLimiter) {
    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/attendance")
                    // /attendance/add
                    .service(
                        web::resource("/add")
                            .wrap(Governor::new(submit_limiter))
                            .route(web::post().to(attendance::add_attendance)),
                    )
                    .service(web::resource("/list").route(web::get().to(attendance::list_attendance)))
                    .service(
                        web::resource("/list-all")
                            .route(web::get().to(attendance::list_all_attendance)),
                    )
                    .service(web::resource("/count").route(web::get().to(attendance::count_attendance)))
                    .service(
                        web::resource("/export").route(web::get().to(attendance::export_attendance)),
                    )
                    .service(
                        web::resource("/delete").route(web::post().to(attendance::delete_attendance)),
                    )
                    .service(
                        web::resource("/close-attendance")
                            .route(web::post().to(attendance::close_attendance)),
                    )
                    // /attendance/leave-count
                    .service(
                        web::resource("/leave-count").route(web::get().to(leave_count::leave_count)),
                    )
                    .service(
                        web::resource("/leave-count/import")
                            .route(web::post().to(leave_count::import_leave_counts)),
                    )
                    .service(
                        web::resource("/sync-from-sheet")
                            .route(web::post().to(leave_count::sync_from_sheet)),
                    )
                    .service(
                        web::resource("/sheet-preview")
                            .route(web::get().to(leave_count::sheet_preview)),
                    ),
            )
            .service(
                web::scope("/toggle")
                    // /toggle
                    .service(web::resource("").route(web::get().to(toggle::get_toggles)))
                    .service(
                        web::resource("/input")
                            .route(web::get().to(toggle::get_input))
                            .route(web::post().to(toggle::set_input)),
                    )
                    .service(
                        web::resource("/attendance")
                            .route(web::get().to(toggle::get_attendance))
                            .route(web::post().to(toggle::set_attendance)),
                    )
                    .service(web::resource("/get-note").route(web::get().to(toggle::get_note)))
                    .service(web::resource("/set-note").route(web::post().to(toggle::set_note))),
            ),
    );
}
