//! Prompt construction for listing scoring.
//!
//! `SCORING_RUBRIC` is the contract with the language model and is pinned by
//! `tests/fixtures/rubric_v1.txt`. Changing its wording means bumping
//! `RUBRIC_VERSION` and adding a new fixture.

use crate::core::{ListingRecord, Prompt, StudentProfile};

pub const RUBRIC_VERSION: &str = "v1";

pub const SCORING_RUBRIC: &str = concat!(
    "DO NOT RETURN ANY EXTRA TEXT. Return me only a single number between 0-100.\n\n",
    "0 being I am not qualified\n",
    "25 being a job that I am qualified for but not in my area of study/interest.\n",
    "50 being a job that I am qualified for and fits some of my description\n",
    "100 being a job that I am qualified for and fits my description and likely to respond to me\n\n",
    "You can use any number between 0-100, the above are checkpoint numbers. ",
    "Make sure that I qualify for the job before giving a score above 0. ",
    "If I do not qualify, return 0. ",
    "(for example, if the job asks for a class year I am not in, return 0)"
);

const REPLY_REMINDER: &str =
    "DO NOT RETURN ANY EXTRA TEXT. Return me only a single number between 0-100.";

/// Renders the profile as the user context block sent before every listing.
pub fn profile_context(profile: &StudentProfile) -> String {
    let mut lines = Vec::new();

    match &profile.school {
        Some(school) => lines.push(format!(
            "I am an undergraduate {} at {} studying {}.",
            profile.year, school, profile.major
        )),
        None => lines.push(format!(
            "I am an undergraduate {} studying {}.",
            profile.year, profile.major
        )),
    }
    if let Some(preferences) = &profile.preferences {
        lines.push(preferences.trim().to_string());
    }
    lines.push(String::new());

    lines.push("My stats are below".to_string());
    lines.push(format!("GPA: {:.2}", profile.gpa));
    push_list(&mut lines, "Relevant Coursework", &profile.coursework);
    push_list(&mut lines, "Honors/Activities", &profile.honors);
    push_list(&mut lines, "Skills", &profile.skills);
    push_list(&mut lines, "Experience", &profile.experience);
    push_list(&mut lines, "Interests", &profile.interests);
    lines.push(String::new());

    lines.push(REPLY_REMINDER.to_string());
    lines.join("\n")
}

fn push_list(lines: &mut Vec<String>, label: &str, items: &[String]) {
    if !items.is_empty() {
        lines.push(format!("{}: {}", label, items.join(", ")));
    }
}

pub fn listing_block(listing: &ListingRecord, max_description_chars: usize) -> String {
    format!(
        "Company Name: {}.\nJob Title: {}\nJob Description: {}",
        listing.employer,
        listing.title,
        truncate_chars(&listing.description, max_description_chars)
    )
}

pub fn build_prompt(
    profile_context: &str,
    listing: &ListingRecord,
    max_description_chars: usize,
) -> Prompt {
    Prompt {
        system: SCORING_RUBRIC.to_string(),
        profile_context: profile_context.to_string(),
        listing: listing_block(listing, max_description_chars),
    }
}

/// 依字元數截斷，不會切在 UTF-8 字元中間
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}…", &text[..byte_idx]),
        None => text.to_string(),
    }
}
