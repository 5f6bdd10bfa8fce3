//! Render worker - runs in a dedicated thread

use std::collections::HashSet;

use flume::{Receiver, Sender};
use log::{debug, warn};

use crate::overlay::engine::{RenderEngine, RenderError, render_target};
use crate::overlay::render::SessionId;

use super::request::{RenderRequest, RenderResponse};

/// Main worker function.
///
/// Requests are drained in batches so that a `Cancel` queued behind the
/// render it targets still takes effect before that render starts.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker<E: RenderEngine>(
    mut engine: E,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
) {
    let mut doc: Option<E::Document> = None;

    while let Ok(first) = requests.recv() {
        let mut batch = vec![first];
        batch.extend(requests.try_iter());

        let cancelled: HashSet<SessionId> = batch
            .iter()
            .filter_map(|request| match request {
                RenderRequest::Cancel(session) => Some(*session),
                _ => None,
            })
            .collect();

        for request in batch {
            match request {
                RenderRequest::Load { load, bytes } => {
                    let response = match engine.load_document(&bytes) {
                        Ok(loaded) => {
                            let page_count = engine.page_count(&loaded);
                            doc = Some(loaded);
                            RenderResponse::DocumentLoaded { load, page_count }
                        }
                        Err(e) => {
                            warn!("Worker failed to load document {load:?}: {e}");
                            doc = None;
                            RenderResponse::LoadFailed { load, error: e }
                        }
                    };
                    let _ = responses.send(response);
                }

                RenderRequest::Render {
                    session,
                    target,
                    editor_width_px,
                } => {
                    if cancelled.contains(&session) {
                        debug!("Skipping cancelled session {session:?}");
                        let _ = responses.send(RenderResponse::Cancelled(session));
                        continue;
                    }
                    let Some(doc) = doc.as_ref() else {
                        let _ = responses.send(RenderResponse::Error {
                            session,
                            error: RenderError::NoDocument,
                        });
                        continue;
                    };
                    let response = match render_target(
                        &mut engine,
                        doc,
                        target.page,
                        target.zoom,
                        editor_width_px,
                    ) {
                        Ok(page) => RenderResponse::Page {
                            session,
                            page: Box::new(page),
                        },
                        Err(error) => RenderResponse::Error { session, error },
                    };
                    let _ = responses.send(response);
                }

                // Already collected above; renders that ran earlier finish normally
                RenderRequest::Cancel(_) => {}

                RenderRequest::Shutdown => return,
            }
        }
    }
}
