//! The single chokepoint from provider-specific intermediate records to the
//! shared [`TodayMenu`] shape. Everything downstream of the parsers — the
//! state machine and every display collaborator — sees only this output.

use lounas_core::format::collapse_ws;
use lounas_core::model::{MenuSection, TodayMenu};

use crate::types::RawProviderPayload;

/// Convert a parsed payload into the shared menu shape.
///
/// Returns `None` exactly when the payload carries no data for the
/// reference day. Uniformly across providers: whitespace is collapsed in
/// every text field, empty component lines are dropped, and sections with
/// neither a name nor components are dropped. The `menus` vector is always
/// real, possibly empty.
#[must_use]
pub fn normalize(payload: &RawProviderPayload) -> Option<TodayMenu> {
    let sections = payload.sections.as_ref()?;

    let menus: Vec<MenuSection> = sections
        .iter()
        .map(|section| MenuSection {
            sort_order: section.sort_order,
            name: collapse_ws(&section.name),
            price: collapse_ws(&section.price),
            components: section
                .components
                .iter()
                .map(|c| collapse_ws(c))
                .filter(|c| !c.is_empty())
                .collect(),
        })
        .filter(|menu| !(menu.name.is_empty() && menu.components.is_empty()))
        .collect();

    Some(TodayMenu {
        date_iso: payload.menu_date_iso.clone(),
        lunch_time: collapse_ws(&payload.lunch_time),
        menus,
    })
}
