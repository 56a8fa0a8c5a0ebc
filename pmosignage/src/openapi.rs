//! Documentation OpenAPI de l'API d'affichage dynamique.

use utoipa::OpenApi;

/// Documentation OpenAPI pour l'API signage.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::get_media_with_settings,
        crate::api::list_sections,
        crate::api::clear_section,
        crate::api::list_materials,
        crate::api::create_material,
        crate::api::get_material,
        crate::api::delete_material,
        crate::api::list_groups,
        crate::api::create_group,
        crate::api::get_group,
        crate::api::update_group,
        crate::api::delete_group,
        crate::api::set_group_members,
        crate::api::add_group_member,
        crate::api::list_assignments,
        crate::api::create_assignment,
        crate::api::get_assignment,
        crate::api::update_assignment,
        crate::api::delete_assignment,
        crate::api::get_settings,
        crate::api::update_settings,
        crate::sse::signage_events_sse,
    ),
    components(
        schemas(
            crate::feed::MediaFeed,
            crate::feed::FeedItem,
            crate::model::DisplaySettings,
            crate::api::SectionResponse,
            crate::api::MaterialResponse,
            crate::api::CreateMaterialRequest,
            crate::api::GroupResponse,
            crate::api::CreateGroupRequest,
            crate::api::UpdateGroupRequest,
            crate::api::SetMembersRequest,
            crate::api::AddMemberRequest,
            crate::api::DeleteGroupResponse,
            crate::api::AssignmentResponse,
            crate::api::CreateAssignmentRequest,
            crate::api::UpdateAssignmentRequest,
            crate::api::ClearSectionResponse,
            crate::api::UpdateSettingsRequest,
            crate::api::ErrorResponse,
            crate::sse::EventPayload,
        )
    ),
    tags(
        (name = "signage", description = "Catalogue d'affichage dynamique et flux des écrans")
    ),
    info(
        title = "PMO Signage API",
        version = "0.1.0",
        description = r#"
# Affichage dynamique

Administration du catalogue :
- matériaux (images, vidéos) enregistrés par URL
- groupes de carrousel ordonnés
- assignations de sections (média unique ou groupe avec décalage de rotation)
- intervalles de lecture

Les écrans lisent `GET /api/signage/media_with_settings` et s'abonnent à
`GET /api/signage/events` pour être notifiés des modifications.
        "#,
        license(
            name = "MIT",
        ),
    )
)]
pub struct ApiDoc;
