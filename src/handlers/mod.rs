pub mod auth;
pub mod bids;
pub mod gigs;

use actix_web::web;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // ── Auth routes (protected by JWT via the AuthenticatedUser extractor) ──
    cfg.service(
        web::scope("/auth")
            .route("/me", web::get().to(auth::me))
            .route("/complete-profile", web::post().to(auth::complete_profile)),
    );

    // ── Gig routes (listing and detail are public; the rest require a JWT) ──
    cfg.service(
        web::scope("/gigs")
            .route("", web::get().to(gigs::list_open_gigs))
            .route("", web::post().to(gigs::create_gig))
            .route("/user/my-gigs", web::get().to(gigs::my_gigs))
            .route("/{gig_id}", web::get().to(gigs::get_gig))
            .route("/{gig_id}", web::patch().to(gigs::update_gig))
            .route("/{gig_id}", web::delete().to(gigs::delete_gig)),
    );

    // ── Bid routes (all protected — require valid JWT) ──
    cfg.service(
        web::scope("/bids")
            .route("", web::post().to(bids::submit_bid))
            .route("/user/my-bids", web::get().to(bids::my_bids))
            .route("/{gig_id}", web::get().to(bids::bids_for_gig))
            .route("/{bid_id}/hire", web::patch().to(bids::hire))
            .route("/{bid_id}", web::delete().to(bids::withdraw_bid)),
    );
}
