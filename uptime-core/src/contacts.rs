use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

use crate::{
    models::{AlertTargets, ContactList, Monitor},
    store::MonitorStore,
};

/// Union of direct targets and contact-list members. Exact string matching,
/// first occurrence wins the position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedContacts {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub webhooks: Vec<String>,
}

impl ResolvedContacts {
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty() && self.webhooks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len() + self.phones.len() + self.webhooks.len()
    }
}

fn push_unique(out: &mut Vec<String>, seen: &mut HashSet<String>, values: &[String]) {
    for value in values {
        if seen.insert(value.clone()) {
            out.push(value.clone());
        }
    }
}

pub fn merge_contacts(direct: &AlertTargets, lists: &[ContactList]) -> ResolvedContacts {
    let mut resolved = ResolvedContacts::default();
    let (mut emails, mut phones, mut webhooks) = (HashSet::new(), HashSet::new(), HashSet::new());

    push_unique(&mut resolved.emails, &mut emails, &direct.email);
    push_unique(&mut resolved.phones, &mut phones, &direct.phone);
    push_unique(&mut resolved.webhooks, &mut webhooks, &direct.webhook);

    for list in lists {
        push_unique(&mut resolved.emails, &mut emails, &list.emails);
        push_unique(&mut resolved.phones, &mut phones, &list.phones);
        push_unique(&mut resolved.webhooks, &mut webhooks, &list.webhooks);
    }

    resolved
}

/// Expands the monitor's contact lists at alert time. A failed lookup falls
/// back to the direct targets alone.
pub async fn resolve_contacts(store: &dyn MonitorStore, monitor: &Monitor) -> ResolvedContacts {
    if monitor.contact_lists.is_empty() {
        return merge_contacts(&monitor.alerts, &[]);
    }

    match store.find_contact_lists(&monitor.contact_lists).await {
        Ok(lists) => merge_contacts(&monitor.alerts, &lists),
        Err(e) => {
            warn!(
                monitor_id = %monitor.id,
                monitor = %monitor.name,
                "Failed to load contact lists, alerting direct targets only: {}",
                e
            );
            merge_contacts(&monitor.alerts, &[])
        }
    }
}
