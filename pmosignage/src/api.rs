//! API REST d'administration du catalogue et flux public des écrans.
//!
//! Toutes les routes sont montées sous `/api/signage`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::feed::MediaFeed;
use crate::manager::{NewMaterial, SignageManager};
use crate::model::{
    Assignment, ContentSource, DisplaySettings, Group, Material, MaterialKind, MaterialOrigin,
};
use crate::sections::Section;

/// Router `/api/signage` combinant les endpoints REST et le flux SSE.
pub fn signage_api_router(manager: SignageManager) -> Router {
    Router::new()
        .route("/media_with_settings", get(get_media_with_settings))
        .route("/sections", get(list_sections))
        .route(
            "/sections/{section_key}/assignments",
            delete(clear_section),
        )
        .route("/materials", get(list_materials).post(create_material))
        .route(
            "/materials/{material_id}",
            get(get_material).delete(delete_material),
        )
        .route("/groups", get(list_groups).post(create_group))
        .route(
            "/groups/{group_id}",
            get(get_group).patch(update_group).delete(delete_group),
        )
        .route(
            "/groups/{group_id}/members",
            get(get_group).put(set_group_members).post(add_group_member),
        )
        .route(
            "/assignments",
            get(list_assignments).post(create_assignment),
        )
        .route(
            "/assignments/{assignment_id}",
            get(get_assignment)
                .patch(update_assignment)
                .delete(delete_assignment),
        )
        .route("/settings", get(get_settings).put(update_settings))
        .merge(crate::sse::signage_events_router())
        .with_state(manager)
}

// ----------------------------------------------------------------------
// DTOs
// ----------------------------------------------------------------------

/// Section d'affichage connue.
#[derive(Debug, Serialize, ToSchema)]
pub struct SectionResponse {
    pub key: String,
    pub label: String,
}

impl From<&Section> for SectionResponse {
    fn from(section: &Section) -> Self {
        Self {
            key: section.key.to_string(),
            label: section.label.to_string(),
        }
    }
}

/// Matériau enregistré.
#[derive(Debug, Serialize, ToSchema)]
pub struct MaterialResponse {
    pub id: String,
    #[serde(rename = "type")]
    #[schema(example = "image")]
    pub kind: String,
    pub filename: String,
    pub url: String,
    /// `global` ou `group_owned`
    #[schema(example = "global")]
    pub source: String,
}

impl From<Material> for MaterialResponse {
    fn from(material: Material) -> Self {
        Self {
            id: material.id,
            kind: material.kind.as_str().to_string(),
            filename: material.filename,
            url: material.locator,
            source: material.origin.as_str().to_string(),
        }
    }
}

/// Requête d'enregistrement d'un matériau déjà hébergé.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMaterialRequest {
    #[serde(rename = "type")]
    #[schema(example = "image")]
    pub kind: String,
    #[schema(example = "logo.png")]
    pub filename: String,
    #[schema(example = "/static/uploads/logo.png")]
    pub url: String,
    #[schema(example = "global")]
    pub source: Option<String>,
}

/// Groupe de carrousel.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    /// Membres dans l'ordre de lecture (doublons possibles)
    pub image_ids: Vec<String>,
}

impl From<Group> for GroupResponse {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
            image_ids: group.members,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    #[schema(example = "Promotions")]
    pub name: String,
    #[serde(default)]
    pub image_ids: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
}

/// Remplace la liste ordonnée des membres.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetMembersRequest {
    pub image_ids: Vec<String>,
}

/// Ajoute un membre en fin de groupe.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub media_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteGroupResponse {
    pub id: String,
    /// Matériaux `group_owned` supprimés avec le groupe
    pub purged_materials: Vec<String>,
}

/// Assignation d'une section.
#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentResponse {
    pub id: String,
    pub section_key: String,
    #[schema(example = "group_reference")]
    pub content_source_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        let content_source_type = assignment.source.type_name().to_string();
        let (media_id, group_id, offset) = match assignment.source {
            ContentSource::SingleMedia { material_id } => (Some(material_id), None, None),
            ContentSource::GroupReference { group_id, offset } => {
                (None, Some(group_id), Some(offset))
            }
        };
        Self {
            id: assignment.id,
            section_key: assignment.section_key,
            content_source_type,
            media_id,
            group_id,
            offset,
        }
    }
}

/// Requête de création d'une assignation.
///
/// `media_id` est requis pour `single_media`, `group_id` pour
/// `group_reference` (offset à 0 par défaut).
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAssignmentRequest {
    #[schema(example = "carousel_top_left")]
    pub section_key: String,
    #[schema(example = "single_media")]
    pub content_source_type: String,
    pub media_id: Option<String>,
    pub group_id: Option<String>,
    #[schema(example = 0)]
    pub offset: Option<i64>,
}

impl CreateAssignmentRequest {
    fn content_source(self) -> crate::Result<(String, ContentSource)> {
        let source = match self.content_source_type.as_str() {
            "single_media" => ContentSource::SingleMedia {
                material_id: self.media_id.ok_or_else(|| {
                    crate::Error::InvalidInput("media_id is required for single_media".into())
                })?,
            },
            "group_reference" => ContentSource::GroupReference {
                group_id: self.group_id.ok_or_else(|| {
                    crate::Error::InvalidInput("group_id is required for group_reference".into())
                })?,
                offset: self.offset.unwrap_or(0),
            },
            other => {
                return Err(crate::Error::InvalidInput(format!(
                    "unknown content_source_type '{}'",
                    other
                )))
            }
        };
        Ok((self.section_key, source))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAssignmentRequest {
    #[schema(example = 2)]
    pub offset: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearSectionResponse {
    pub section_key: String,
    pub removed: usize,
}

/// Mise à jour partielle des intervalles (secondes).
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub header_interval: Option<u32>,
    pub carousel_interval: Option<u32>,
    pub footer_interval: Option<u32>,
}

/// Réponse d'erreur REST générique.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

// ----------------------------------------------------------------------
// Flux public
// ----------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/signage/media_with_settings",
    tag = "signage",
    responses(
        (status = 200, description = "Médias résolus par section et intervalles de lecture", body = MediaFeed),
        (status = 500, description = "Erreur de persistance", body = ErrorResponse)
    )
)]
pub async fn get_media_with_settings(State(manager): State<SignageManager>) -> Response {
    match manager.media_feed() {
        Ok(feed) => (StatusCode::OK, Json(feed)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/signage/sections",
    tag = "signage",
    responses(
        (status = 200, description = "Sections d'affichage disponibles", body = [SectionResponse])
    )
)]
pub async fn list_sections(State(manager): State<SignageManager>) -> Response {
    let payload: Vec<SectionResponse> = manager
        .sections()
        .iter()
        .map(SectionResponse::from)
        .collect();
    (StatusCode::OK, Json(payload)).into_response()
}

// ----------------------------------------------------------------------
// Matériaux
// ----------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/signage/materials",
    tag = "signage",
    responses(
        (status = 200, description = "Tous les matériaux", body = [MaterialResponse])
    )
)]
pub async fn list_materials(State(manager): State<SignageManager>) -> Response {
    match manager.list_materials() {
        Ok(materials) => {
            let payload: Vec<MaterialResponse> =
                materials.into_iter().map(MaterialResponse::from).collect();
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/signage/materials",
    tag = "signage",
    request_body = CreateMaterialRequest,
    responses(
        (status = 201, description = "Matériau enregistré", body = MaterialResponse),
        (status = 400, description = "Requête invalide", body = ErrorResponse)
    )
)]
pub async fn create_material(
    State(manager): State<SignageManager>,
    Json(req): Json<CreateMaterialRequest>,
) -> Response {
    let result = (|| {
        let kind: MaterialKind = req.kind.parse()?;
        let origin: MaterialOrigin = match req.source.as_deref() {
            Some(source) => source.parse()?,
            None => MaterialOrigin::Global,
        };
        manager.create_material(NewMaterial {
            kind,
            filename: req.filename,
            locator: req.url,
            origin,
        })
    })();

    match result {
        Ok(material) => (StatusCode::CREATED, Json(MaterialResponse::from(material))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/signage/materials/{material_id}",
    tag = "signage",
    params(
        ("material_id" = String, Path, description = "Identifiant du matériau")
    ),
    responses(
        (status = 200, description = "Matériau", body = MaterialResponse),
        (status = 404, description = "Matériau introuvable", body = ErrorResponse)
    )
)]
pub async fn get_material(
    State(manager): State<SignageManager>,
    Path(material_id): Path<String>,
) -> Response {
    match manager.get_material(&material_id) {
        Ok(material) => (StatusCode::OK, Json(MaterialResponse::from(material))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    delete,
    path = "/api/signage/materials/{material_id}",
    tag = "signage",
    params(
        ("material_id" = String, Path, description = "Identifiant du matériau")
    ),
    responses(
        (status = 204, description = "Matériau supprimé avec ses références"),
        (status = 404, description = "Matériau introuvable", body = ErrorResponse)
    )
)]
pub async fn delete_material(
    State(manager): State<SignageManager>,
    Path(material_id): Path<String>,
) -> Response {
    match manager.delete_material(&material_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => map_error(err),
    }
}

// ----------------------------------------------------------------------
// Groupes
// ----------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/signage/groups",
    tag = "signage",
    responses(
        (status = 200, description = "Tous les groupes de carrousel", body = [GroupResponse])
    )
)]
pub async fn list_groups(State(manager): State<SignageManager>) -> Response {
    match manager.list_groups() {
        Ok(groups) => {
            let payload: Vec<GroupResponse> = groups.into_iter().map(GroupResponse::from).collect();
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/signage/groups",
    tag = "signage",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Groupe créé", body = GroupResponse),
        (status = 400, description = "Nom vide", body = ErrorResponse),
        (status = 404, description = "Membre introuvable", body = ErrorResponse)
    )
)]
pub async fn create_group(
    State(manager): State<SignageManager>,
    Json(req): Json<CreateGroupRequest>,
) -> Response {
    match manager.create_group(&req.name, req.image_ids) {
        Ok(group) => (StatusCode::CREATED, Json(GroupResponse::from(group))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/signage/groups/{group_id}",
    tag = "signage",
    params(
        ("group_id" = String, Path, description = "Identifiant du groupe")
    ),
    responses(
        (status = 200, description = "Groupe", body = GroupResponse),
        (status = 404, description = "Groupe introuvable", body = ErrorResponse)
    )
)]
pub async fn get_group(
    State(manager): State<SignageManager>,
    Path(group_id): Path<String>,
) -> Response {
    match manager.get_group(&group_id) {
        Ok(group) => (StatusCode::OK, Json(GroupResponse::from(group))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    patch,
    path = "/api/signage/groups/{group_id}",
    tag = "signage",
    params(
        ("group_id" = String, Path, description = "Identifiant du groupe")
    ),
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Groupe mis à jour", body = GroupResponse),
        (status = 404, description = "Groupe introuvable", body = ErrorResponse)
    )
)]
pub async fn update_group(
    State(manager): State<SignageManager>,
    Path(group_id): Path<String>,
    Json(req): Json<UpdateGroupRequest>,
) -> Response {
    let result = match req.name {
        Some(name) => manager.rename_group(&group_id, &name),
        None => manager.get_group(&group_id),
    };

    match result {
        Ok(group) => (StatusCode::OK, Json(GroupResponse::from(group))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    delete,
    path = "/api/signage/groups/{group_id}",
    tag = "signage",
    params(
        ("group_id" = String, Path, description = "Identifiant du groupe")
    ),
    responses(
        (status = 200, description = "Groupe supprimé", body = DeleteGroupResponse),
        (status = 404, description = "Groupe introuvable", body = ErrorResponse)
    )
)]
pub async fn delete_group(
    State(manager): State<SignageManager>,
    Path(group_id): Path<String>,
) -> Response {
    match manager.delete_group(&group_id) {
        Ok(purged_materials) => (
            StatusCode::OK,
            Json(DeleteGroupResponse {
                id: group_id,
                purged_materials,
            }),
        )
            .into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    put,
    path = "/api/signage/groups/{group_id}/members",
    tag = "signage",
    params(
        ("group_id" = String, Path, description = "Identifiant du groupe")
    ),
    request_body = SetMembersRequest,
    responses(
        (status = 200, description = "Membres remplacés ou réordonnés", body = GroupResponse),
        (status = 404, description = "Groupe ou matériau introuvable", body = ErrorResponse)
    )
)]
pub async fn set_group_members(
    State(manager): State<SignageManager>,
    Path(group_id): Path<String>,
    Json(req): Json<SetMembersRequest>,
) -> Response {
    match manager.set_group_members(&group_id, req.image_ids) {
        Ok(group) => (StatusCode::OK, Json(GroupResponse::from(group))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/signage/groups/{group_id}/members",
    tag = "signage",
    params(
        ("group_id" = String, Path, description = "Identifiant du groupe")
    ),
    request_body = AddMemberRequest,
    responses(
        (status = 200, description = "Membre ajouté en fin de groupe", body = GroupResponse),
        (status = 404, description = "Groupe ou matériau introuvable", body = ErrorResponse)
    )
)]
pub async fn add_group_member(
    State(manager): State<SignageManager>,
    Path(group_id): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> Response {
    match manager.add_group_member(&group_id, &req.media_id) {
        Ok(group) => (StatusCode::OK, Json(GroupResponse::from(group))).into_response(),
        Err(err) => map_error(err),
    }
}

// ----------------------------------------------------------------------
// Assignations
// ----------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/signage/assignments",
    tag = "signage",
    responses(
        (status = 200, description = "Assignations dans l'ordre de création", body = [AssignmentResponse])
    )
)]
pub async fn list_assignments(State(manager): State<SignageManager>) -> Response {
    match manager.list_assignments() {
        Ok(assignments) => {
            let payload: Vec<AssignmentResponse> = assignments
                .into_iter()
                .map(AssignmentResponse::from)
                .collect();
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/signage/assignments",
    tag = "signage",
    request_body = CreateAssignmentRequest,
    responses(
        (status = 201, description = "Assignation créée", body = AssignmentResponse),
        (status = 400, description = "Section inconnue ou requête invalide", body = ErrorResponse),
        (status = 404, description = "Matériau ou groupe introuvable", body = ErrorResponse)
    )
)]
pub async fn create_assignment(
    State(manager): State<SignageManager>,
    Json(req): Json<CreateAssignmentRequest>,
) -> Response {
    let result = req
        .content_source()
        .and_then(|(section_key, source)| manager.create_assignment(&section_key, source));

    match result {
        Ok(assignment) => {
            (StatusCode::CREATED, Json(AssignmentResponse::from(assignment))).into_response()
        }
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/signage/assignments/{assignment_id}",
    tag = "signage",
    params(
        ("assignment_id" = String, Path, description = "Identifiant de l'assignation")
    ),
    responses(
        (status = 200, description = "Assignation", body = AssignmentResponse),
        (status = 404, description = "Assignation introuvable", body = ErrorResponse)
    )
)]
pub async fn get_assignment(
    State(manager): State<SignageManager>,
    Path(assignment_id): Path<String>,
) -> Response {
    match manager.get_assignment(&assignment_id) {
        Ok(assignment) => (StatusCode::OK, Json(AssignmentResponse::from(assignment))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    patch,
    path = "/api/signage/assignments/{assignment_id}",
    tag = "signage",
    params(
        ("assignment_id" = String, Path, description = "Identifiant de l'assignation")
    ),
    request_body = UpdateAssignmentRequest,
    responses(
        (status = 200, description = "Décalage mis à jour", body = AssignmentResponse),
        (status = 400, description = "Décalage négatif ou média unique", body = ErrorResponse),
        (status = 404, description = "Assignation introuvable", body = ErrorResponse)
    )
)]
pub async fn update_assignment(
    State(manager): State<SignageManager>,
    Path(assignment_id): Path<String>,
    Json(req): Json<UpdateAssignmentRequest>,
) -> Response {
    match manager.set_assignment_offset(&assignment_id, req.offset) {
        Ok(assignment) => (StatusCode::OK, Json(AssignmentResponse::from(assignment))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    delete,
    path = "/api/signage/assignments/{assignment_id}",
    tag = "signage",
    params(
        ("assignment_id" = String, Path, description = "Identifiant de l'assignation")
    ),
    responses(
        (status = 204, description = "Assignation supprimée"),
        (status = 404, description = "Assignation introuvable", body = ErrorResponse)
    )
)]
pub async fn delete_assignment(
    State(manager): State<SignageManager>,
    Path(assignment_id): Path<String>,
) -> Response {
    match manager.delete_assignment(&assignment_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    delete,
    path = "/api/signage/sections/{section_key}/assignments",
    tag = "signage",
    params(
        ("section_key" = String, Path, description = "Clé de section")
    ),
    responses(
        (status = 200, description = "Assignations de la section supprimées", body = ClearSectionResponse),
        (status = 400, description = "Section inconnue", body = ErrorResponse)
    )
)]
pub async fn clear_section(
    State(manager): State<SignageManager>,
    Path(section_key): Path<String>,
) -> Response {
    match manager.clear_section(&section_key) {
        Ok(removed) => (
            StatusCode::OK,
            Json(ClearSectionResponse {
                section_key,
                removed,
            }),
        )
            .into_response(),
        Err(err) => map_error(err),
    }
}

// ----------------------------------------------------------------------
// Réglages
// ----------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/signage/settings",
    tag = "signage",
    responses(
        (status = 200, description = "Intervalles de lecture", body = DisplaySettings)
    )
)]
pub async fn get_settings(State(manager): State<SignageManager>) -> Response {
    match manager.settings() {
        Ok(settings) => (StatusCode::OK, Json(settings)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    put,
    path = "/api/signage/settings",
    tag = "signage",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Intervalles mis à jour", body = DisplaySettings),
        (status = 400, description = "Intervalle nul", body = ErrorResponse)
    )
)]
pub async fn update_settings(
    State(manager): State<SignageManager>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Response {
    let result = manager.settings().and_then(|current| {
        manager.update_settings(DisplaySettings {
            header_interval: req.header_interval.unwrap_or(current.header_interval),
            carousel_interval: req.carousel_interval.unwrap_or(current.carousel_interval),
            footer_interval: req.footer_interval.unwrap_or(current.footer_interval),
        })
    });

    match result {
        Ok(settings) => (StatusCode::OK, Json(settings)).into_response(),
        Err(err) => map_error(err),
    }
}

fn map_error(error: crate::Error) -> Response {
    let status = match error {
        crate::Error::MaterialNotFound(_)
        | crate::Error::GroupNotFound(_)
        | crate::Error::AssignmentNotFound(_) => StatusCode::NOT_FOUND,
        crate::Error::UnknownSection(_) | crate::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        crate::Error::PersistenceError(_)
        | crate::Error::ManagerNotInitialized
        | crate::Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %error, "Signage request failed");
    }

    (
        status,
        Json(ErrorResponse {
            error: format!("{:?}", error),
            message: error.to_string(),
        }),
    )
        .into_response()
}
