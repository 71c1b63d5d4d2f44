use shared::support::is_company_domain;
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::inbound::address::email_domain;
use crate::store::SupportStore;

/// Company for a requester address, created on first contact.
///
/// Free mail domains never map to a company. A new company is named after
/// `name_hint` (the form's company field) or the domain itself.
pub async fn resolve_for_email(
    store: &dyn SupportStore,
    email: &str,
    name_hint: Option<&str>,
) -> ServiceResult<Option<Uuid>> {
    let Some(domain) = email_domain(email) else {
        return Ok(None);
    };
    if !is_company_domain(&domain) {
        return Ok(None);
    }

    if let Some(company) = store.find_company_by_domain(&domain).await? {
        return Ok(Some(company.id));
    }

    let name = name_hint
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(&domain);
    let company = store.create_company(name, &domain).await?;
    tracing::info!(company_id = %company.id, domain = %domain, "Company created");
    Ok(Some(company.id))
}
