//! Prompt templates keyed by topic and audience.
//!
//! This is the single table of prompt text. Lookups take the raw wire strings so
//! the fallback can echo whatever the caller selected.

const BEHAVIORAL_PSYCHOLOGY_MIDDLE_MANAGERS: &str = "\
Create a LinkedIn post about recent behavioral psychology insights that help middle managers solve everyday challenges.

Based on current research including dual-process theory, nudge theory, and positive psychology findings:

Structure:
- Start with a relatable problem middle managers face (being caught between leadership and frontline, decision fatigue, team motivation challenges)
- Present 2-3 practical applications from behavioral psychology research (e.g., System 1 vs System 2 thinking, choice architecture, positive psychology interventions)
- Include specific, actionable advice they can implement this week
- End with an engaging question to drive comments

Style: Professional but conversational, include relevant emojis for readability, focus on immediate practical value.
Tone: Authoritative but approachable, evidence-based but not academic.

Length: 300-400 words maximum.
Include: Real examples, quick wins, and connection to current research trends.";

const BEHAVIORAL_PSYCHOLOGY_HR_PROFESSIONALS: &str = "\
Create a LinkedIn post about behavioral psychology applications for HR professionals.

Focus on recent research in employee behavior, motivation, and organizational psychology.
Include practical HR applications and policy implications.";

const BEHAVIORAL_PSYCHOLOGY_EXECUTIVES: &str = "\
Create a LinkedIn post about behavioral economics insights for executive decision-making.

Focus on strategic applications, organizational behavior, and leadership psychology.
Include high-level insights and business impact.";

const LEADERSHIP_TRENDS_MIDDLE_MANAGERS: &str = "\
Create a LinkedIn post about current leadership trends that middle managers should know about.

Focus on trends that bridge the gap between senior leadership strategy and frontline execution.
Include practical implementation tips and end with a question that encourages engagement.

Length: 300-400 words maximum.";

const LEADERSHIP_TRENDS_HR_PROFESSIONALS: &str = "\
Create a LinkedIn post about leadership development trends affecting HR strategy.

Focus on emerging leadership competencies and development approaches.";

const LEADERSHIP_TRENDS_EXECUTIVES: &str = "\
Create a LinkedIn post about strategic leadership trends shaping organizational success.

Focus on high-level leadership evolution and competitive advantage.";

const WORKPLACE_INNOVATION_MIDDLE_MANAGERS: &str = "\
Create a LinkedIn post about workplace innovation trends that middle managers can leverage.

Focus on practical innovations in team management, process improvement, and employee engagement.
Include actionable insights and real-world applications.";

const WORKPLACE_INNOVATION_HR_PROFESSIONALS: &str = "\
Create a LinkedIn post about HR innovation and technology trends.

Focus on emerging HR technologies and their impact on people operations.";

const WORKPLACE_INNOVATION_EXECUTIVES: &str = "\
Create a LinkedIn post about strategic workplace innovation trends.

Focus on organizational transformation and competitive advantage through innovation.";

const MANAGEMENT_INSIGHTS_MIDDLE_MANAGERS: &str = "\
Create a LinkedIn post sharing key management insights for middle managers.

Focus on practical management challenges and evidence-based solutions.
Include specific tips and actionable advice.";

const MANAGEMENT_INSIGHTS_HR_PROFESSIONALS: &str = "\
Create a LinkedIn post about management insights relevant to HR professionals.

Focus on manager development and HR's role in management effectiveness.";

const MANAGEMENT_INSIGHTS_EXECUTIVES: &str = "\
Create a LinkedIn post about strategic management insights for senior leaders.

Focus on organizational management and strategic leadership perspectives.";

/// Returns the curated template for an exact (topic, audience) pair.
pub fn template_for(topic: &str, audience: &str) -> Option<&'static str> {
    let template = match (topic, audience) {
        ("behavioral-psychology", "middle-managers") => BEHAVIORAL_PSYCHOLOGY_MIDDLE_MANAGERS,
        ("behavioral-psychology", "hr-professionals") => BEHAVIORAL_PSYCHOLOGY_HR_PROFESSIONALS,
        ("behavioral-psychology", "executives") => BEHAVIORAL_PSYCHOLOGY_EXECUTIVES,
        ("leadership-trends", "middle-managers") => LEADERSHIP_TRENDS_MIDDLE_MANAGERS,
        ("leadership-trends", "hr-professionals") => LEADERSHIP_TRENDS_HR_PROFESSIONALS,
        ("leadership-trends", "executives") => LEADERSHIP_TRENDS_EXECUTIVES,
        ("workplace-innovation", "middle-managers") => WORKPLACE_INNOVATION_MIDDLE_MANAGERS,
        ("workplace-innovation", "hr-professionals") => WORKPLACE_INNOVATION_HR_PROFESSIONALS,
        ("workplace-innovation", "executives") => WORKPLACE_INNOVATION_EXECUTIVES,
        ("management-insights", "middle-managers") => MANAGEMENT_INSIGHTS_MIDDLE_MANAGERS,
        ("management-insights", "hr-professionals") => MANAGEMENT_INSIGHTS_HR_PROFESSIONALS,
        ("management-insights", "executives") => MANAGEMENT_INSIGHTS_EXECUTIVES,
        _ => return None,
    };
    Some(template)
}

/// Builds the user prompt for a selection.
///
/// Curated templates ignore `style`. Pairs without a template get a generic
/// engagement prompt that names the topic and audience verbatim, plus a style
/// line when one was requested.
pub fn build_prompt(topic: &str, audience: &str, style: Option<&str>) -> String {
    if let Some(template) = template_for(topic, audience) {
        return template.to_string();
    }

    let mut prompt = format!(
        "Create a professional LinkedIn post about {topic} for {audience}.\n\n\
         Make it engaging, practical, and include actionable insights.\n\
         Length: 300-400 words maximum.\n\
         Include relevant emojis and end with a question to encourage engagement."
    );
    if let Some(style) = style {
        prompt.push_str(&format!("\nStyle: {style}."));
    }
    prompt
}
