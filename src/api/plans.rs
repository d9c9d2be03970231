// Subscription plans and request gating

use once_cell::sync::Lazy;
use serde::Serialize;

use super::models::Subscription;
use crate::error::{ApiError, Result};

/// Characters per request without an active subscription
pub const MAX_TEXT_LENGTH: usize = 1000;

/// `-1` in a limit means unlimited
pub const UNLIMITED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanInterval {
    Month,
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub characters_per_request: i64,
    pub requests_per_day: i64,
    pub bulk_paraphrase: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    pub price: u32,
    pub currency: &'static str,
    pub interval: PlanInterval,
    pub features: Vec<&'static str>,
    pub limits: PlanLimits,
    pub ios_product_id: Option<&'static str>,
}

impl Plan {
    /// Max characters per request, `None` when unlimited
    pub fn character_limit(&self) -> Option<usize> {
        usize::try_from(self.limits.characters_per_request).ok()
    }
}

pub static SUBSCRIPTION_PLANS: Lazy<Vec<Plan>> = Lazy::new(|| {
    vec![Plan {
        id: "pro",
        name: "Pro",
        price: 5,
        currency: "USD",
        interval: PlanInterval::Month,
        features: vec![
            "Paraphrase in any language (auto-detect)",
            "Paraphrase and translate at the same time",
            "Unlimited paraphrase with AI",
            "All paraphrasing styles",
        ],
        limits: PlanLimits {
            characters_per_request: UNLIMITED,
            requests_per_day: UNLIMITED,
            bulk_paraphrase: true,
        },
        ios_product_id: Some("com.frazai.pro"),
    }]
});

pub fn find_plan(id: &str) -> Option<&'static Plan> {
    SUBSCRIPTION_PLANS.iter().find(|p| p.id == id)
}

/// Character limit for a user with the given subscription
pub fn character_limit(subscription: Option<&Subscription>) -> Option<usize> {
    match subscription.filter(|s| s.is_active()) {
        Some(sub) => find_plan(&sub.plan_id).and_then(Plan::character_limit),
        None => Some(MAX_TEXT_LENGTH),
    }
}

/// Reject paraphrase input the backend would refuse for this user
pub fn check_paraphrase_request(text: &str, subscription: Option<&Subscription>) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ApiError::Validation("Text to paraphrase is required".to_string()));
    }

    if let Some(limit) = character_limit(subscription) {
        let length = text.chars().count();
        if length > limit {
            return Err(ApiError::Validation(format!(
                "Text is {} characters, the limit for your plan is {}",
                length, limit
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::SubscriptionStatus;
    use chrono::Utc;

    fn subscription(plan_id: &str, status: SubscriptionStatus) -> Subscription {
        Subscription {
            id: 1,
            user_id: 1,
            paddle_subscription_id: None,
            plan_id: plan_id.to_string(),
            status,
            current_period_end: Utc::now(),
            cancel_at_period_end: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_pro_plan_is_unlimited() {
        let pro = find_plan("pro").unwrap();
        assert_eq!(pro.character_limit(), None);
        assert_eq!(pro.price, 5);
        assert!(find_plan("enterprise").is_none());
    }

    #[test]
    fn test_free_users_are_limited() {
        let text = "a".repeat(MAX_TEXT_LENGTH);
        assert!(check_paraphrase_request(&text, None).is_ok());

        let text = "a".repeat(MAX_TEXT_LENGTH + 1);
        assert!(matches!(
            check_paraphrase_request(&text, None),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_limit_counts_characters_not_bytes() {
        let text = "é".repeat(MAX_TEXT_LENGTH);
        assert!(check_paraphrase_request(&text, None).is_ok());
    }

    #[test]
    fn test_active_and_trial_subscriptions_lift_limit() {
        let text = "a".repeat(MAX_TEXT_LENGTH * 10);
        for status in [SubscriptionStatus::Active, SubscriptionStatus::Trial] {
            let sub = subscription("pro", status);
            assert!(check_paraphrase_request(&text, Some(&sub)).is_ok());
        }
    }

    #[test]
    fn test_inactive_subscription_is_free_tier() {
        let text = "a".repeat(MAX_TEXT_LENGTH + 1);
        for status in [SubscriptionStatus::Canceled, SubscriptionStatus::Expired] {
            let sub = subscription("pro", status);
            assert!(check_paraphrase_request(&text, Some(&sub)).is_err());
        }
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(check_paraphrase_request("   \n", None).is_err());
    }
}
