//! Yektanet panel API client
//!
//! Talks to the same internal endpoints the advertiser panel uses. Auth
//! is a short-lived JWT minted from the operator's panel session cookie;
//! tokens are refreshed before every operation rather than cached.
//!
//! Campaigns and ads are always created inactive (`user_apply` off) so a
//! human flips the switch in the panel after review.

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::{targeting, AdPlatform, AdPlatformError};
use crate::config::YektanetConfig;
use crate::domain::{AdDescription, CampaignPlan, MAX_CTA_CHARS};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:140.0) Gecko/20100101 Firefox/140.0";

/// ISPs the campaign is shown on when ISP targeting is nominally enabled
const DISPLAY_ISP: &[&str] = &[
    "Shatel",
    "Iran Cell",
    "Mobile Communication Company",
    "Rightel",
    "Asiatech",
    "Mobin Net",
    "Telecommunication",
    "Pars Online",
    "Afranet",
    "Respina",
    "Information Technology Company",
    "Neda Rayaneh",
    "Other",
];

/// A freshly minted panel session
struct PanelSession {
    jwt: String,
    advertiser_id: i64,
}

/// Real Yektanet implementation of [`AdPlatform`]
pub struct YektanetClient {
    accounts_url: String,
    api_url: String,
    ad_management_url: String,
    assistant_url: String,
    account_id: String,
    cookie: String,
    http: Client,
}

impl YektanetClient {
    /// Create a client from configuration; resolves credentials from the
    /// environment
    pub fn from_config(config: &YektanetConfig) -> Result<Self, AdPlatformError> {
        debug!("YektanetClient::from_config: called");
        let account_id = config.get_account_id().map_err(AdPlatformError::Auth)?;
        let session_id = config.get_session_id().map_err(AdPlatformError::Auth)?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(AdPlatformError::Network)?;

        Ok(Self {
            accounts_url: config.accounts_url.clone(),
            api_url: config.api_url.clone(),
            ad_management_url: config.ad_management_url.clone(),
            assistant_url: config.assistant_url.clone(),
            account_id,
            cookie: format!("sessionid={}", session_id),
            http,
        })
    }

    /// Mint a JWT from the panel session cookie and resolve the
    /// advertiser id. Tokens are short-lived, so every operation calls
    /// this first.
    async fn refresh_token(&self) -> Result<PanelSession, AdPlatformError> {
        debug!("YektanetClient::refresh_token: called");
        let url = format!(
            "{}/api/v2/token/access/internal/?account={}",
            self.accounts_url, self.account_id
        );
        let response = self
            .http
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json, text/plain, */*")
            .header("Referer", "https://panel.yektanet.com/")
            .header("Origin", "https://panel.yektanet.com")
            .header("Cookie", &self.cookie)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AdPlatformError::Auth(format!("token refresh failed ({}): {}", status, message)));
        }

        let body: serde_json::Value = response.json().await?;
        let token = body["token"]
            .as_str()
            .ok_or_else(|| AdPlatformError::InvalidResponse("token missing from refresh response".to_string()))?;
        let jwt = format!("JWT {}", token);

        let profile = self
            .http
            .get(format!("{}/api/v2/adv/profile/", self.api_url))
            .header("Authorization", &jwt)
            .header("Cookie", &self.cookie)
            .send()
            .await?;

        if !profile.status().is_success() {
            let status = profile.status().as_u16();
            let message = profile.text().await.unwrap_or_default();
            return Err(AdPlatformError::Auth(format!("profile fetch failed ({}): {}", status, message)));
        }

        let body: serde_json::Value = profile.json().await?;
        let advertiser_id = body["id"]
            .as_i64()
            .ok_or_else(|| AdPlatformError::InvalidResponse("advertiser id missing from profile".to_string()))?;

        debug!(advertiser_id, "YektanetClient::refresh_token: session ready");
        Ok(PanelSession {
            jwt,
            advertiser_id,
        })
    }

    /// Campaign creation payload for the panel API.
    ///
    /// Unknown targeting labels are silently dropped; the is_keyword /
    /// is_category / segmentation flags reflect what survives.
    fn build_campaign_payload(plan: &CampaignPlan, advertiser_id: i64, utm_tag: &str) -> serde_json::Value {
        let categories = targeting::resolve_categories(&plan.targeting_config.categories);
        let segments = targeting::resolve_segments(&plan.targeting_config.user_segments);
        let keywords = &plan.targeting_config.keywords;

        serde_json::json!({
            "title": plan.name,
            "campaign_type": plan.campaign_type.to_string(),
            "only_re_targeting": false,
            "only_related_content": true,
            "is_keyword": !keywords.is_empty(),
            "is_category": !categories.is_empty(),
            "is_audience_sharing": false,
            "is_autotargeting": false,
            "segmentation_selected": !segments.is_empty(),
            "auto_publishers_select": true,
            "display_publisher_group": "",
            "publishers_visible": true,
            "core_partners": [],
            "is_fixed": false,
            "property_type": null,
            "minimum_interval_between_duplicates": 24,
            "cost_limit": plan.budget,
            "bid": plan.bid_toman,
            "use_campaign_total_balance": false,
            "bidding_strategy": plan.bidding_strategy,
            "monetization_type": "cpc",
            "utm_campaign": format!("adv_{}_{}", advertiser_id, utm_tag),
            "utm_medium": "native-targeted",
            "utm_term_status": "محتوا",
            "utm_term": "",
            "utm_content_status": "ناشر",
            "utm_content": "",
            "utm_source": "yektanet",
            "is_daily": false,
            "is_periodic": false,
            "device_os_type": "all",
            "display_all_os_versions": true,
            "display_all_mobile_brands": true,
            "display_mobile_brand": [],
            "display_all_countries": true,
            "countries": [],
            "display_location": [],
            "show_only_in_capital": false,
            "display_in_all_isp": true,
            "display_isp": DISPLAY_ISP,
            "publisher_floating_bids": [],
            "publisher_group_floating_bids": [],
            "subcategories": categories
                .iter()
                .map(|code| serde_json::json!({ "category_id": code, "subcategory_id": 0 }))
                .collect::<Vec<_>>(),
            "keywords": keywords
                .iter()
                .map(|k| serde_json::json!({ "keyword": k }))
                .collect::<Vec<_>>(),
            "negative_keywords": [],
            "broad_allowed": true,
            "goal": { "type": "9", "tags": [] },
            "config": { "segment_ids": segments },
            "segmentation_enabled": !segments.is_empty(),
            "target_suppliers": ["web", "push"],
            "is_push_supplier_active": true,
            "is_adivery_supplier_active": false,
            "is_divar": false,
            "divar_config": {
                "cities": [],
                "category_slugs": [],
                "categories": [],
                "keywords": [],
                "neighborhoods": [],
                "min_price": null,
                "max_price": null,
                "brands": [],
                "smart_targeting": true,
            },
            "is_rubika": false,
            // Campaigns go live only after a human activates them in the panel
            "user_apply": false,
        })
    }
}

/// Random 7-digit utm tag (digits 1-9, matching the panel's own format)
fn random_utm_tag() -> String {
    let mut rng = rand::rng();
    (0..7).map(|_| char::from(b'1' + rng.random_range(0..9u8))).collect()
}

/// Truncate a call to action to the platform limit, by characters
fn truncate_cta(cta: &str) -> String {
    cta.chars().take(MAX_CTA_CHARS).collect()
}

#[async_trait]
impl AdPlatform for YektanetClient {
    async fn create_campaign(&self, plan: &CampaignPlan) -> Result<i64, AdPlatformError> {
        debug!(plan_id = %plan.id, "YektanetClient::create_campaign: called");
        let session = self.refresh_token().await?;
        let payload = Self::build_campaign_payload(plan, session.advertiser_id, &random_utm_tag());

        let response = self
            .http
            .post(format!("{}/api/v2/adv/campaigns/", self.api_url))
            .header("Authorization", &session.jwt)
            .header("Cookie", &self.cookie)
            .json(&payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 201 {
            let message = response.text().await.unwrap_or_default();
            return Err(AdPlatformError::Api { status, message });
        }

        let body: serde_json::Value = response.json().await?;
        let campaign_id = body["id"]
            .as_i64()
            .ok_or_else(|| AdPlatformError::InvalidResponse("campaign id missing".to_string()))?;

        info!(campaign_id, plan_id = %plan.id, "YektanetClient::create_campaign: created");
        Ok(campaign_id)
    }

    async fn generate_ad_image(&self, prompt: &str) -> Result<String, AdPlatformError> {
        debug!(prompt_len = prompt.len(), "YektanetClient::generate_ad_image: called");
        let session = self.refresh_token().await?;

        let response = self
            .http
            .post(format!("{}/api/v2/facilitator/assets/images/", self.assistant_url))
            .header("Authorization", &session.jwt)
            .header("Cookie", &self.cookie)
            .json(&serde_json::json!({
                "raw_prompt": prompt,
                "campaign_id": null,
                "images_count": 1,
                "images_ratio": "3:2",
            }))
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 201 {
            let message = response.text().await.unwrap_or_default();
            return Err(AdPlatformError::Api { status, message });
        }

        let body: serde_json::Value = response.json().await?;
        let image_url = body["images"][0]["image"]
            .as_str()
            .ok_or_else(|| AdPlatformError::InvalidResponse("image url missing".to_string()))?;

        info!(image_url, "YektanetClient::generate_ad_image: generated");
        Ok(image_url.to_string())
    }

    async fn create_ad(&self, campaign_id: i64, ad: &AdDescription) -> Result<i64, AdPlatformError> {
        debug!(campaign_id, ad_title = %ad.title, "YektanetClient::create_ad: called");
        let image_url = ad
            .image
            .url
            .as_deref()
            .ok_or_else(|| AdPlatformError::MissingImage(ad.title.clone()))?;

        // Fetch the creative first so a broken image fails before any
        // panel mutation
        let image_response = self.http.get(image_url).send().await?;
        if !image_response.status().is_success() {
            let status = image_response.status().as_u16();
            return Err(AdPlatformError::Api {
                status,
                message: format!("image download failed: {}", image_url),
            });
        }
        let image_bytes = image_response.bytes().await?;

        let session = self.refresh_token().await?;

        let form = reqwest::multipart::Form::new()
            .text("campaign", campaign_id.to_string())
            .text("title", ad.title.clone())
            .text("item_url", ad.landing_url.clone())
            .text("description", "")
            .text("user_apply", "off")
            .text("cta_color", "#9BD2FF")
            .text("cta_title", truncate_cta(&ad.call_to_action))
            .text("image_source", "manual")
            .part(
                "image",
                reqwest::multipart::Part::bytes(image_bytes.to_vec())
                    .file_name("image.png")
                    .mime_str("image/png")
                    .map_err(|e| AdPlatformError::InvalidResponse(e.to_string()))?,
            );

        let response = self
            .http
            .post(format!("{}/v1/ad/", self.ad_management_url))
            .header("Authorization", &session.jwt)
            .header("Cookie", &self.cookie)
            .multipart(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 201 {
            let message = response.text().await.unwrap_or_default();
            return Err(AdPlatformError::Api { status, message });
        }

        let body: serde_json::Value = response.json().await?;
        let ad_id = body["id"]
            .as_i64()
            .ok_or_else(|| AdPlatformError::InvalidResponse("ad id missing".to_string()))?;

        info!(campaign_id, ad_id, "YektanetClient::create_ad: created");
        Ok(ad_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample_draft;

    fn sample_plan() -> CampaignPlan {
        CampaignPlan::from_draft("sess-1", sample_draft(1)).unwrap()
    }

    #[test]
    fn test_campaign_payload_basics() {
        let plan = sample_plan();
        let payload = YektanetClient::build_campaign_payload(&plan, 42, "1234567");

        assert_eq!(payload["title"], plan.name);
        assert_eq!(payload["campaign_type"], "native");
        assert_eq!(payload["cost_limit"], plan.budget);
        assert_eq!(payload["bid"], plan.bid_toman);
        assert_eq!(payload["bidding_strategy"], "cpc");
        assert_eq!(payload["utm_campaign"], "adv_42_1234567");
        assert_eq!(payload["user_apply"], false);
        assert_eq!(payload["target_suppliers"], serde_json::json!(["web", "push"]));
    }

    #[test]
    fn test_campaign_payload_targeting_flags() {
        let plan = sample_plan();
        let payload = YektanetClient::build_campaign_payload(&plan, 42, "1111111");

        assert_eq!(payload["is_keyword"], true);
        assert_eq!(payload["is_category"], true);
        assert_eq!(payload["segmentation_selected"], true);
        assert_eq!(payload["segmentation_enabled"], true);
        assert_eq!(payload["keywords"][0]["keyword"], "قهوه");
        assert_eq!(payload["subcategories"][0]["category_id"], "IAB210");
        assert_eq!(payload["config"]["segment_ids"][0], 9);
    }

    #[test]
    fn test_campaign_payload_drops_unknown_labels() {
        let mut draft = sample_draft(1);
        draft.targeting_config.categories = vec!["not a real label".to_string()];
        draft.targeting_config.user_segments = vec!["also fake".to_string()];
        draft.targeting_config.keywords = vec![];
        let plan = CampaignPlan::from_draft("sess-1", draft).unwrap();

        let payload = YektanetClient::build_campaign_payload(&plan, 42, "1111111");
        assert_eq!(payload["is_keyword"], false);
        assert_eq!(payload["is_category"], false);
        assert_eq!(payload["segmentation_selected"], false);
        assert_eq!(payload["subcategories"], serde_json::json!([]));
        assert_eq!(payload["config"]["segment_ids"], serde_json::json!([]));
    }

    #[test]
    fn test_truncate_cta_by_chars() {
        assert_eq!(truncate_cta("short"), "short");
        assert_eq!(truncate_cta(&"a".repeat(20)), "a".repeat(13));
        // Persian characters count as one each despite being multi-byte
        let long = "همین حالا رزرو کنید";
        assert_eq!(truncate_cta(long).chars().count(), 13);
    }

    #[test]
    fn test_random_utm_tag_format() {
        for _ in 0..20 {
            let tag = random_utm_tag();
            assert_eq!(tag.len(), 7);
            assert!(tag.chars().all(|c| ('1'..='9').contains(&c)));
        }
    }
}
