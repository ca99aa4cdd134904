// HTTP surface: deck and tree JSON endpoints plus the two rendered pages.

use rocket::form::Form;
use rocket::http::RawStr;
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::{catch, get, post, uri, FromForm, Request, Responder, State};
use rocket_dyn_templates::{context, Template};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deck::{Cover, CoverUpdate, CoverUpsert, Deck};
use crate::error::{AppError, Result};
use crate::navigation::DeckView;
use crate::store::Library;
use crate::tree::{Node, TreeDocument};

/// Run whole-document file I/O off the async workers.
async fn blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))?
}

#[get("/api/health")]
pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server_time": chrono::Local::now().to_rfc3339()
    }))
}

// ---- deck ----

#[get("/api/artists/<artist>/covers")]
pub async fn list_covers(artist: &str, library: &State<Library>) -> Result<Json<Deck>> {
    let store = library.deck_store(artist)?;
    let deck = blocking(move || store.list()).await?;
    Ok(Json(deck))
}

#[post("/api/artists/<artist>/covers", format = "json", data = "<deck>")]
pub async fn replace_covers(
    artist: &str,
    deck: Json<Deck>,
    library: &State<Library>,
) -> Result<Json<Deck>> {
    let store = library.deck_store(artist)?;
    let deck = deck.into_inner();
    let saved = blocking(move || store.replace(deck)).await?;
    Ok(Json(saved))
}

#[derive(Debug, FromForm)]
pub struct CoverForm {
    // checked by `parse_form_id`, unparsable text is an error
    pub id: Option<String>,
    pub category: Option<String>,
    #[field(name = "albumTitle")]
    pub album_title: Option<String>,
    #[field(name = "coverLabel")]
    pub cover_label: Option<String>,
    #[field(name = "frontImage")]
    pub front_image: Option<String>,
    pub music: Option<String>,
}

/// Blank id means create; anything else must be a cover id.
fn parse_form_id(raw: Option<&str>) -> Result<Option<u64>> {
    match raw.map(str::trim).filter(|text| !text.is_empty()) {
        None => Ok(None),
        Some(text) => text
            .parse::<u64>()
            .map(Some)
            .map_err(|_| AppError::MalformedInput(format!("id '{}' is not a cover id", text))),
    }
}

impl TryFrom<CoverForm> for CoverUpsert {
    type Error = AppError;

    fn try_from(form: CoverForm) -> Result<Self> {
        Ok(CoverUpsert {
            id: parse_form_id(form.id.as_deref())?,
            fields: CoverUpdate {
                category: form.category,
                album_title: form.album_title,
                cover_label: form.cover_label,
                front_image: form.front_image,
                music: form.music,
            },
        })
    }
}

#[post("/api/artists/<artist>/covers/save", data = "<form>")]
pub async fn save_cover(
    artist: &str,
    form: Form<CoverForm>,
    library: &State<Library>,
) -> Result<Redirect> {
    let store = library.deck_store(artist)?;
    let upsert = CoverUpsert::try_from(form.into_inner())?;
    let cover = blocking(move || store.upsert(upsert)).await?;
    log::debug!("Saved cover {} for {}, back to listing", cover.id, artist);
    Ok(Redirect::to(uri!(admin_page(artist))))
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub id: u64,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: Cover,
    pub position: usize,
}

#[post("/api/artists/<artist>/covers/delete", format = "json", data = "<request>")]
pub async fn delete_cover(
    artist: &str,
    request: Json<DeleteRequest>,
    library: &State<Library>,
) -> Result<Json<DeleteResponse>> {
    let store = library.deck_store(artist)?;
    let id = request.id;
    let (position, deleted) = blocking(move || store.delete(id)).await?;
    Ok(Json(DeleteResponse { deleted, position }))
}

// ---- content tree ----

#[get("/api/artists/<artist>/assets")]
pub async fn get_assets(artist: &str, library: &State<Library>) -> Result<Json<TreeDocument>> {
    let store = library.tree_store(artist)?;
    let doc = blocking(move || store.get()).await?;
    Ok(Json(doc))
}

#[post("/api/artists/<artist>/assets", format = "json", data = "<doc>")]
pub async fn replace_assets(
    artist: &str,
    doc: Json<TreeDocument>,
    library: &State<Library>,
) -> Result<Json<TreeDocument>> {
    let store = library.tree_store(artist)?;
    let doc = doc.into_inner();
    let saved = blocking(move || store.replace(doc)).await?;
    Ok(Json(saved))
}

#[derive(Debug, Deserialize)]
pub struct InsertNodeRequest {
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub path: Vec<String>,
    pub node: Node,
}

#[post("/api/artists/<artist>/assets/nodes", format = "json", data = "<request>")]
pub async fn insert_asset_node(
    artist: &str,
    request: Json<InsertNodeRequest>,
    library: &State<Library>,
) -> Result<Json<TreeDocument>> {
    let store = library.tree_store(artist)?;
    let InsertNodeRequest { root, path, node } = request.into_inner();
    let doc = blocking(move || store.insert(root.as_deref(), &path, node)).await?;
    Ok(Json(doc))
}

#[derive(Debug, Deserialize)]
pub struct RemoveNodeRequest {
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub path: Vec<String>,
    pub name: String,
}

#[post("/api/artists/<artist>/assets/nodes/delete", format = "json", data = "<request>")]
pub async fn remove_asset_node(
    artist: &str,
    request: Json<RemoveNodeRequest>,
    library: &State<Library>,
) -> Result<Json<Node>> {
    let store = library.tree_store(artist)?;
    let RemoveNodeRequest { root, path, name } = request.into_inner();
    let removed = blocking(move || store.remove(root.as_deref(), &path, &name)).await?;
    Ok(Json(removed))
}

// ---- pages ----

/// Public carousel. `q` filters by title, `at` moves the cursor from the
/// first match.
#[get("/artists/<artist>?<q>&<at>")]
pub async fn carousel(
    artist: &str,
    q: Option<&str>,
    at: Option<isize>,
    library: &State<Library>,
) -> Result<Template> {
    let store = library.deck_store(artist)?;
    let deck = blocking(move || store.list()).await?;

    let mut view = DeckView::new(deck);
    view.filter(q.unwrap_or(""));
    view.advance(at.unwrap_or(0));

    let cards = view.render();
    Ok(Template::render("carousel", context! {
        artist,
        term: view.term(),
        term_query: RawStr::new(view.term()).percent_encode().to_string(),
        total: view.all_covers().len(),
        visible: cards.len(),
        active_index: view.active_index(),
        cards,
    }))
}

#[derive(Debug, Serialize)]
struct AdminRow<'a> {
    id: u64,
    category: &'a str,
    album_title: &'a str,
    cover_label: &'a str,
    front_image: &'a str,
    music_json: String,
}

#[get("/artists/<artist>/admin")]
pub async fn admin_page(artist: &str, library: &State<Library>) -> Result<Template> {
    let store = library.deck_store(artist)?;
    let deck = blocking(move || store.list()).await?;

    let mut rows = Vec::with_capacity(deck.len());
    for cover in &deck {
        let music_json = serde_json::to_string_pretty(&cover.music())
            .map_err(|e| AppError::Internal(format!("music of cover {}: {}", cover.id, e)))?;
        rows.push(AdminRow {
            id: cover.id,
            category: cover.category(),
            album_title: cover.display_title(),
            cover_label: cover.cover_label(),
            front_image: cover.front_image(),
            music_json,
        });
    }

    Ok(Template::render("admin", context! {
        artist,
        rows,
    }))
}

// Error catchers. API callers get JSON, browsers get the error page.

#[derive(Responder)]
pub enum ErrorBody {
    Json(Json<Value>),
    Page(Template),
}

fn error_body(req: &Request<'_>, status: u16, message: &str) -> ErrorBody {
    if req.uri().path().as_str().starts_with("/api/") {
        ErrorBody::Json(Json(serde_json::json!({ "error": message })))
    } else {
        ErrorBody::Page(Template::render("error", context! {
            status,
            message,
        }))
    }
}

#[catch(400)]
pub async fn bad_request(req: &Request<'_>) -> ErrorBody {
    error_body(req, 400, "Bad request")
}

#[catch(404)]
pub async fn not_found(req: &Request<'_>) -> ErrorBody {
    error_body(req, 404, "Not found")
}

#[catch(422)]
pub async fn unprocessable(req: &Request<'_>) -> ErrorBody {
    error_body(req, 422, "Request body does not match the expected shape")
}

#[catch(500)]
pub async fn server_error(req: &Request<'_>) -> ErrorBody {
    error_body(req, 500, "Internal server error")
}
