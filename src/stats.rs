use serde::Serialize;

/// Owned-citation totals for one (week, platform).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnedCitationSummary {
    #[serde(rename = "Week")]
    pub week: String,
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Total_prompt_executions")]
    pub total_rows: usize,
    #[serde(rename = "Selected_URL_Citations")]
    pub exact_cited: usize,
    #[serde(rename = "any_url_from_domain_excluding_specified_URLs_Citations")]
    pub other_domain_cited: usize,
    /// Distinct prompts with any target-domain URL cited.
    #[serde(rename = "Unique_Prompts_with_Owned_Citations")]
    pub unique_owned_prompts: usize,
}

/// Citation rate of one target URL within one (week, platform).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlCitationRate {
    #[serde(rename = "Week")]
    pub week: String,
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(skip)]
    pub total_rows: usize,
    #[serde(rename = "Rows_with_Selected_URL_Cited")]
    pub rows_cited: usize,
    #[serde(rename = "selected_URL_Citation_Rate")]
    pub rate: f64,
}

/// Stage-one console breakdown, rates in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekPlatformBreakdown {
    #[serde(rename = "Week")]
    pub week: String,
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Selected_URL_Citations")]
    pub exact_cited: usize,
    #[serde(rename = "Any_Domain_URLs")]
    pub any_domain_cited: usize,
    #[serde(rename = "Other_Domain_URLs")]
    pub other_domain_cited: usize,
    #[serde(rename = "Total_prompt_executions")]
    pub total_rows: usize,
    #[serde(rename = "Selected_URL_Rate_%")]
    pub exact_rate_pct: f64,
    #[serde(rename = "Any_Domain_Rate_%")]
    pub any_domain_rate_pct: f64,
    #[serde(rename = "Other_Domain_Rate_%")]
    pub other_domain_rate_pct: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RateReport {
    pub owned: Vec<OwnedCitationSummary>,
    pub by_url: Vec<UrlCitationRate>,
}
