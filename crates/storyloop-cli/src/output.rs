use claude_driver::{AgentEvent, ToolResult, ToolUse};

/// Maximum lines of tool output shown per event; longer output keeps the
/// head and tail with an omitted-count line between them.
const TRUNCATE_LINES: usize = 20;
const TRUNCATE_KEEP: usize = 10;

// ---------------------------------------------------------------------------
// Event rendering
// ---------------------------------------------------------------------------

/// Render one agent event to stdout, in stream order.
pub fn render_event(event: &AgentEvent) {
    match event {
        AgentEvent::SessionInit => println!("● Session started\n"),
        AgentEvent::Text(text) => {
            if !text.is_empty() {
                println!("{text}\n");
            }
        }
        AgentEvent::ToolUse(tool) => render_tool_use(tool),
        AgentEvent::ToolResult(result) => render_tool_result(result),
        AgentEvent::SessionResult => println!("● Session complete"),
    }
}

fn render_tool_use(tool: &ToolUse) {
    println!("┌─ Tool: {}", tool.name);
    if let Some(description) = &tool.description {
        println!("│  {description}");
    }
    if let Some(command) = &tool.command {
        println!("│  $ {command}");
    }
    if let Some(file_path) = &tool.file_path {
        println!("│  File: {file_path}");
    }
    println!("└─");
}

fn render_tool_result(result: &ToolResult) {
    if let Some(stdout) = result.stdout.as_deref() {
        if !stdout.is_empty() {
            let output = truncate_output(stdout);
            println!("   {}\n", output.replace('\n', "\n   "));
        }
    }
    if let Some(stderr) = result.stderr.as_deref() {
        if !stderr.is_empty() {
            println!("   [stderr] {stderr}\n");
        }
    }
    if result.interrupted {
        println!("   [interrupted]\n");
    }
}

fn truncate_output(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() <= TRUNCATE_LINES {
        return output.to_string();
    }
    let omitted = lines.len() - 2 * TRUNCATE_KEEP;
    format!(
        "{}\n... ({omitted} lines omitted) ...\n{}",
        lines[..TRUNCATE_KEEP].join("\n"),
        lines[lines.len() - TRUNCATE_KEEP..].join("\n"),
    )
}

// ---------------------------------------------------------------------------
// Progress banners
// ---------------------------------------------------------------------------

/// Printed by the lifecycle progress callback before each phase starts.
pub fn step_banner(index: usize, total: usize, phase: &str) {
    println!("\n── [{index}/{total}] {phase} ─────────────────────────────");
}

/// Header printed before each story in a batch.
pub fn story_banner(index: usize, total: usize, story: &str) {
    println!("\n══ story [{index}/{total}]: {story} ══════════════════════");
}

// ---------------------------------------------------------------------------
// Batch summary
// ---------------------------------------------------------------------------

pub struct StoryResult {
    pub story: String,
    pub mark: char,
    pub note: String,
}

/// Summary table printed after `queue` / `epic` batches.
pub fn batch_summary(results: &[StoryResult], remaining: &[String]) {
    println!("\n── summary ────────────────────────────────────────");
    for result in results {
        println!("  {} {:<32} {}", result.mark, result.story, result.note);
    }
    for story in remaining {
        println!("  ○ {story:<32} (not attempted)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_is_untouched() {
        assert_eq!(truncate_output("one\ntwo"), "one\ntwo");
    }

    #[test]
    fn long_output_keeps_head_and_tail() {
        let input: Vec<String> = (1..=30).map(|i| format!("line {i}")).collect();
        let truncated = truncate_output(&input.join("\n"));
        assert!(truncated.starts_with("line 1\n"));
        assert!(truncated.ends_with("line 30"));
        assert!(truncated.contains("... (10 lines omitted) ..."));
        assert!(!truncated.contains("line 15"));
    }
}
