/// Fixed skill vocabulary matched against titles and descriptions.
pub const SKILL_VOCABULARY: &[&str] = &[
    "JavaScript",
    "TypeScript",
    "Python",
    "Java",
    "C++",
    "C#",
    "Go",
    "Rust",
    "React",
    "Vue",
    "Angular",
    "Node.js",
    "Express",
    "Django",
    "Flask",
    "AWS",
    "Azure",
    "GCP",
    "Docker",
    "Kubernetes",
    "Git",
    "SQL",
    "PostgreSQL",
    "MongoDB",
    "Redis",
    "Machine Learning",
    "AI",
    "Data Science",
];

/// Case-insensitive substring match against [`SKILL_VOCABULARY`], in vocabulary order.
///
/// Plain substring matching is deliberately loose: "javascript" also yields "Java".
pub fn extract_skills(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    SKILL_VOCABULARY
        .iter()
        .filter(|skill| lower.contains(&skill.to_lowercase()))
        .map(|skill| skill.to_string())
        .collect()
}
