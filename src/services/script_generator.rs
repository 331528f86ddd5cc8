// Script generation from a selected angle, plus display formatting

use crate::ai::{first_parsed, parse_json_payload, AiOutcome, SharedGenerator};
use crate::models::ai::{Angle, GeneratedScript, ResearchBrief};
use crate::models::viral::ViralVideo;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BROLL_MARKER: Regex = Regex::new(r"\[B-ROLL:\s*([^\]]+)\]").unwrap();
    static ref GESTURE_MARKER: Regex = Regex::new(r"\[GESTURE:\s*([^\]]+)\]").unwrap();
}

const SECTION_RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

const SECTION_HEADINGS: [(&str, &str); 7] = [
    ("[HOOK]", "🎯 HOOK (0:00 - 0:08)"),
    ("[INTRO]", "🎬 INTRODUCTION (0:08 - 0:30)"),
    ("[SECTION 1]", "📝 SECTION 1 (~0:30 - 3:00)"),
    ("[SECTION 2]", "📝 SECTION 2 (~3:00 - 5:30)"),
    ("[SECTION 3]", "📝 SECTION 3 (~5:30 - 8:00)"),
    ("[CONCLUSION]", "🎯 CONCLUSION & CTA (~8:00 - 9:00)"),
    ("[BODY]", "📝 MAIN CONTENT"),
];

pub struct ScriptGenerator {
    generators: Vec<SharedGenerator>,
}

impl ScriptGenerator {
    pub fn new(generators: Vec<SharedGenerator>) -> Self {
        Self { generators }
    }

    pub async fn generate(
        &self,
        video: &ViralVideo,
        angle: &Angle,
        brief: Option<&ResearchBrief>,
    ) -> AiOutcome<GeneratedScript> {
        let prompt = build_prompt(video, angle, brief);
        tracing::info!("Generating script for '{}' using angle '{}'", video.title, angle.angle_name);

        match first_parsed(&self.generators, &prompt, parse_script).await {
            Some(script) => AiOutcome::Parsed(script),
            None => {
                tracing::warn!("Using fallback script");
                AiOutcome::Fallback(fallback_script(&video.title, angle))
            }
        }
    }
}

fn build_prompt(video: &ViralVideo, angle: &Angle, brief: Option<&ResearchBrief>) -> String {
    let research = match brief {
        Some(brief) => format!(
            "RESEARCH SUMMARY: {}\nNARRATIVE HOOKS: {}\nNEW FACTS: {}",
            brief.executive_summary,
            brief.narrative_hooks.join(" | "),
            serde_json::to_string(&brief.new_facts).unwrap_or_default()
        ),
        None => "No additional research provided.".to_string(),
    };

    format!(
        r#"Write a 8-10 minute YouTube script remaking this video with a fresh angle.

ORIGINAL: {title} ({views} views)
ANGLE: {name}
HOOK: {hook}
DIFFERENTIATOR: {diff}

{research}

Use the section markers [HOOK], [INTRO], [SECTION 1], [SECTION 2], [SECTION 3], [CONCLUSION].
Return ONLY a JSON object with "script", "titles" (4 strings), "thumbnails" (4 strings),
"hook_options", "estimated_duration" and "word_count"."#,
        title = video.title,
        views = video.view_count,
        name = angle.angle_name,
        hook = angle.core_hook,
        diff = angle.key_differentiator,
    )
}

/// Requires `script`, `titles` and `thumbnails`; fills in the word count when missing.
pub fn parse_script(text: &str) -> Option<GeneratedScript> {
    let mut script = match parse_json_payload::<GeneratedScript>(text) {
        Ok(script) => script,
        Err(e) => {
            tracing::warn!("Script response did not parse: {}", e);
            return None;
        }
    };
    if script.script.trim().is_empty() {
        return None;
    }
    if script.word_count == 0 {
        script.word_count = script.script.split_whitespace().count();
    }
    Some(script)
}

pub fn fallback_script(title: &str, angle: &Angle) -> GeneratedScript {
    let script = format!(
        "[HOOK]
{hook}

[INTRO]
I've been researching this topic for weeks...
And what I found completely changed how I think about it.

[B-ROLL: Show research notes or computer screen]

In this video, we're taking a fresh look at {title} from a different angle.
{diff}

[SECTION 1]
Let's start with the most surprising discovery...

[B-ROLL: Relevant imagery for topic]

[SECTION 2]
This is where it gets REALLY interesting.

[B-ROLL: Examples or demonstrations]

[SECTION 3]
The real breakthrough is this...

[CONCLUSION]
So here's your one action item...

If this changed how you think about this topic...
You'll definitely want to check out my video on [related topic].

[GESTURE: Point to video suggestion]
",
        hook = angle.core_hook,
        title = title,
        diff = angle.key_differentiator,
    );

    GeneratedScript {
        word_count: script.split_whitespace().count(),
        script,
        hook_options: vec![
            format!("What if everything you knew about {} was wrong?", title),
            "I spent 40 hours researching this... here's what nobody tells you.".to_string(),
            format!("The {} that experts don't want you to know.", angle.angle_name),
        ],
        titles: vec![
            format!("The Truth About {}", title),
            format!("What They Don't Tell You About {}", title),
            format!("I Analyzed {} - Here's What I Found", title),
            format!("{}: Deep Dive", angle.angle_name),
        ],
        thumbnails: vec![
            "Shocked face + Red arrow pointing to key stat + Text: 'THE TRUTH'".to_string(),
            "Split screen before/after + Yellow highlight + Text: 'EXPOSED'".to_string(),
            "Creator pointing at screen + Graph going up + Text: 'PROOF'".to_string(),
            "Crossed arms serious expression + Bold text + Text: 'WRONG'".to_string(),
        ],
        estimated_duration: "8-10 minutes".to_string(),
    }
}

/// Expand section markers into headed blocks and style B-roll/gesture cues.
pub fn format_script_for_display(script: &str) -> String {
    let mut formatted = script.to_string();

    for (marker, heading) in SECTION_HEADINGS {
        formatted = formatted.replace(marker, &format!("\n\n{SECTION_RULE}\n{heading}\n{SECTION_RULE}\n"));
    }
    formatted = formatted.replace("[PAUSE]", "\n⏸️ [PAUSE]\n");

    let formatted = BROLL_MARKER.replace_all(&formatted, "\n\n🎥 B-ROLL: $1\n");
    GESTURE_MARKER
        .replace_all(&formatted, "\n👋 [$1]\n")
        .into_owned()
}
