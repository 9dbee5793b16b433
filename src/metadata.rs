//! Posting-time and hashtag derivation for generated posts.

pub const DEFAULT_POSTING_TIME: &str = "Tuesday 8:30 AM EST";

/// Best slot to publish for an audience. Unknown audiences get [`DEFAULT_POSTING_TIME`].
pub fn optimal_posting_time(audience: &str) -> &'static str {
    match audience {
        "middle-managers" => "Tuesday 8:30 AM EST",
        "hr-professionals" => "Wednesday 9:00 AM EST",
        "executives" => "Tuesday 7:00 AM EST",
        "entrepreneurs" => "Thursday 9:00 AM EST",
        _ => DEFAULT_POSTING_TIME,
    }
}

fn topic_tags(topic: &str) -> &'static [&'static str] {
    match topic {
        "behavioral-psychology" => &["#BehavioralScience", "#Psychology", "#Leadership", "#Management"],
        "leadership-trends" => &["#Leadership", "#Management", "#WorkplaceTrends", "#ProfessionalDevelopment"],
        "workplace-innovation" => &["#Innovation", "#WorkplaceChange", "#Management", "#Leadership"],
        "management-insights" => &["#Management", "#Leadership", "#TeamLeadership", "#ProfessionalGrowth"],
        _ => &[],
    }
}

fn audience_tags(audience: &str) -> &'static [&'static str] {
    match audience {
        "middle-managers" => &["#MiddleManagement", "#TeamLeadership"],
        "hr-professionals" => &["#HR", "#PeopleOperations", "#HumanResources"],
        "executives" => &["#ExecutiveLeadership", "#Strategy"],
        "entrepreneurs" => &["#Entrepreneurship", "#StartupLife"],
        _ => &[],
    }
}

/// Topic tags followed by audience tags, each in declared order. A tag shared
/// by both tables is kept only at its first position.
pub fn hashtags_for(topic: &str, audience: &str) -> Vec<&'static str> {
    let mut tags: Vec<&'static str> = Vec::new();
    for tag in topic_tags(topic).iter().chain(audience_tags(audience)) {
        if !tags.contains(tag) {
            tags.push(*tag);
        }
    }
    tags
}
