use utoipa::OpenApi;

use crate::features::{competitions, matches};

#[derive(OpenApi)]
#[openapi(
    paths(
        competitions::handlers::list_competitions,
        competitions::handlers::get_competition,
        competitions::handlers::get_bracket,
        competitions::handlers::get_standings,
        competitions::handlers::create_competition,
        competitions::handlers::update_competition,
        competitions::handlers::delete_competition,
        competitions::handlers::generate_bracket,
        competitions::handlers::clear_bracket,
        competitions::handlers::reconcile_bracket,
        matches::handlers::get_match,
        matches::handlers::start_voting,
        matches::handlers::submit_vote,
        matches::handlers::complete_match,
        matches::handlers::close_expired,
    ),
    components(
        schemas(
            storage::dto::competition::CreateCompetitionRequest,
            storage::dto::competition::UpdateCompetitionRequest,
            storage::dto::competition::CompetitionResponse,
            storage::dto::matches::GenerateBracketRequest,
            storage::dto::matches::StartVotingRequest,
            storage::dto::matches::VoteRequest,
            storage::dto::matches::CompleteMatchRequest,
            storage::models::Match,
            storage::models::BracketType,
            storage::models::MatchStatus,
            storage::models::CompetitionType,
            storage::models::CompetitionStatus,
            storage::models::VotingMethod,
            bracket::BracketView,
            bracket::MatchView,
            bracket::PerformerSlotView,
            bracket::StandingRow,
            bracket::VoteOutcome,
            bracket::Completion,
            bracket::AdvanceOutcome,
            bracket::CloseSummary,
            bracket::CloseFailure,
        )
    ),
    tags(
        (name = "competitions", description = "Competition setup, brackets and standings"),
        (name = "matches", description = "Match voting and completion"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("API Key")
                        .build(),
                ),
            )
        }
    }
}
