use std::collections::BTreeSet;

use crate::types::quote::QuoteType;
use crate::types::report::TcbComponentId;
use crate::types::tcb_info::{Tcb, TcbComponent, TcbInfo, TcbLevel, TcbStatus, TdxModuleTcbLevel};
use crate::types::TcbLevelInfo;

use super::dedup_preserving_order;

fn sgx_components(tcb: &Tcb) -> Option<&[TcbComponent]> {
    Some(tcb.sgxtcbcomponents.as_slice())
}

fn tdx_components(tcb: &Tcb) -> Option<&[TcbComponent]> {
    tcb.tdxtcbcomponents.as_deref()
}

/// Highest SVN seen per component index across all levels of a TCB Info.
///
/// This is the latest version the fetched collateral knows about, not an absolute one.
pub fn highest_svns<F>(levels: &[TcbLevel], selector: F) -> Vec<u8>
where
    F: Fn(&Tcb) -> Option<&[TcbComponent]>,
{
    let mut highest: Vec<u8> = Vec::new();
    for components in levels.iter().filter_map(|level| selector(&level.tcb)) {
        if highest.len() < components.len() {
            highest.resize(components.len(), 0);
        }
        for (max, component) in highest.iter_mut().zip(components) {
            *max = (*max).max(component.svn);
        }
    }
    highest
}

/// Labelled components of `matched` that are behind `highest`.
fn stale_components(matched: &[TcbComponent], highest: &[u8]) -> Vec<TcbComponentId> {
    matched
        .iter()
        .zip(highest)
        .filter(|(component, highest)| component.is_labelled() && **highest > component.svn)
        .map(|(component, _)| TcbComponentId {
            category: component.category.clone(),
            r#type: component.r#type.clone(),
        })
        .collect()
}

/// Components of the matched platform level (and TDX module level) that are out of date.
///
/// SVN values are not reported, only what the component is.
pub fn out_of_date_components(
    quote_type: QuoteType,
    tcb_info: &TcbInfo,
    matched: &TcbLevel,
    module_level: Option<&TdxModuleTcbLevel>,
) -> Vec<TcbComponentId> {
    let highest_sgx = highest_svns(&tcb_info.tcb_levels, sgx_components);
    let mut components = stale_components(&matched.tcb.sgxtcbcomponents, &highest_sgx);

    if quote_type == QuoteType::Tdx {
        if let Some(matched_tdx) = tdx_components(&matched.tcb) {
            let highest_tdx = highest_svns(&tcb_info.tcb_levels, tdx_components);
            components.extend(stale_components(matched_tdx, &highest_tdx));
        }

        if module_level.is_some_and(|level| level.tcb_status() == TcbStatus::OutOfDate) {
            components.push(TcbComponentId::tdx_module());
        }
    }

    dedup_preserving_order(components)
}

/// Advisory IDs of all matched levels, sorted and without duplicates.
pub fn collect_advisory_ids(levels: &[&dyn TcbLevelInfo]) -> Vec<String> {
    levels
        .iter()
        .flat_map(|level| level.advisory_ids())
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}
