use super::{ExecContext, Execution, Notice, Outcome, SideEffect};
use crate::model::{Block, Document, PageLinkProps};
use crate::store::DataStore;

/// Creates a child page of the edited page and appends a link to it.
///
/// When the store refuses, the document gets the transcript as a plain paragraph
/// instead, so the user's words are kept.
pub fn create_linked<S: DataStore>(
    document: &Document,
    title: &str,
    icon: &str,
    ctx: &mut ExecContext<'_, S>,
) -> Execution {
    match ctx.store.create_page(Some(ctx.page_id), title, icon) {
        Ok(page) => {
            let link = Block::link_to(PageLinkProps {
                page_id: page.id(),
                page_title: page.title().to_string(),
                page_icon: page.metadata.icon.clone(),
            });
            tracing::debug!(parent = %ctx.page_id, page = %page.id(), "linked page created");
            let notice = Notice::success(format!("Created page \"{}\"", page.title()));
            Execution::applied(document.append(vec![link]), 1)
                .with_effect(SideEffect::PageCreated(page))
                .with_notice(notice)
        }
        Err(e) => {
            tracing::warn!(parent = %ctx.page_id, error = %e, "linked page creation failed");
            let spoken = ctx.transcript.trim();
            let text = if spoken.is_empty() { title } else { spoken };
            Execution {
                document: document.append(vec![Block::paragraph(text)]),
                outcome: Outcome::Fallback {
                    error: e.to_string(),
                },
                side_effects: Vec::new(),
            }
            .with_notice(Notice::error(format!("Could not create page: {}", e)))
        }
    }
}
