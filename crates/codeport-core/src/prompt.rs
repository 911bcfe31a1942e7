//! Prompt construction for the external AI service.
//!
//! Prompts are deterministic: the same file, source and target always yield
//! the same instruction text, so a mocked service produces stable results
//! in tests.

use crate::platform::Platform;

/// File-type category used to specialize the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    AndroidLayout,
    AndroidManifest,
    Markup,
    Code,
}

fn classify(rel_path: &str) -> FileKind {
    let lower = rel_path.to_ascii_lowercase();
    if lower.ends_with(".xml") {
        if lower.contains("androidmanifest") {
            FileKind::AndroidManifest
        } else if lower.contains("layout") || lower.contains("activity_") {
            FileKind::AndroidLayout
        } else {
            FileKind::Markup
        }
    } else if lower.ends_with(".storyboard") || lower.ends_with(".xib") {
        FileKind::Markup
    } else {
        FileKind::Code
    }
}

/// System prompt naming the source and target platforms.
pub fn system_prompt(source: Platform, target: Platform) -> String {
    format!(
        "You are an expert mobile app developer specializing in cross-platform code conversion.\n\
         Your task is to convert {source} code to {target} code while maintaining the same functionality.\n\
         \n\
         Special handling for different file types:\n\
         - For Java/Kotlin files: Convert class structures, methods, and Android-specific APIs\n\
         - For XML layout files: Convert Android layouts to equivalent iOS storyboard/XIB concepts or SwiftUI code\n\
         - For AndroidManifest.xml: Convert to iOS Info.plist equivalent information\n\
         - Maintain proper platform conventions and best practices\n\
         \n\
         Key guidelines:\n\
         1. Preserve the original logic and functionality\n\
         2. Use platform-appropriate naming conventions and patterns\n\
         3. Convert UI components to their platform equivalents\n\
         4. Handle platform-specific APIs appropriately\n\
         5. Maintain code structure and organization\n\
         6. Add helpful comments for complex conversions\n\
         7. Ensure the converted code follows best practices for the target platform\n\
         \n\
         Return only the converted code without any explanations or markdown formatting.",
        source = source.label(),
        target = target.label(),
    )
}

/// Per-file user prompt embedding the relative path and file contents.
pub fn user_prompt(rel_path: &str, contents: &str, source: Platform, target: Platform) -> String {
    let (file_type, note) = match classify(rel_path) {
        FileKind::AndroidLayout => (
            "Android layout XML".to_owned(),
            format!(
                "Convert this Android layout to equivalent {} layout approach (SwiftUI, Storyboard, or XIB)",
                target.label()
            ),
        ),
        FileKind::AndroidManifest => (
            "AndroidManifest.xml".to_owned(),
            "Convert this Android manifest to equivalent iOS Info.plist format".to_owned(),
        ),
        FileKind::Markup => (
            format!("{} markup", source.label()),
            format!("Convert this markup to equivalent {} format", target.label()),
        ),
        FileKind::Code => (
            format!("{} code", source.label()),
            format!(
                "Convert this code to {} while maintaining the same functionality and structure",
                target.label()
            ),
        ),
    };

    format!(
        "Convert the following {file_type} to {target}:\n\
         \n\
         File: {rel_path}\n\
         \n\
         Source Code:\n\
         {contents}\n\
         \n\
         Instructions: {note}\n\
         - Follow platform best practices and conventions\n\
         - Maintain equivalent functionality\n\
         - Provide only the converted code without explanations",
        target = target.label(),
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prompts_are_deterministic() {
        let a = user_prompt("src/Main.java", "class Main {}", Platform::AndroidJava, Platform::IosSwift);
        let b = user_prompt("src/Main.java", "class Main {}", Platform::AndroidJava, Platform::IosSwift);
        assert_eq!(a, b);
    }

    #[test]
    fn prompt_embeds_path_platforms_and_contents() {
        let p = user_prompt("src/Main.java", "class Main {}", Platform::AndroidJava, Platform::IosSwift);
        assert!(p.contains("File: src/Main.java"));
        assert!(p.contains("class Main {}"));
        assert!(p.contains("iOS Swift"));

        let s = system_prompt(Platform::AndroidJava, Platform::IosSwift);
        assert!(s.contains("Android Java"));
        assert!(s.contains("iOS Swift"));
    }

    #[test]
    fn layout_files_get_layout_instructions() {
        let p = user_prompt(
            "res/layout/activity_main.xml",
            "<LinearLayout/>",
            Platform::AndroidJava,
            Platform::IosSwift,
        );
        assert!(p.contains("Android layout XML"));
        assert!(p.contains("SwiftUI"));
    }

    #[test]
    fn manifest_gets_plist_instructions() {
        let p = user_prompt(
            "app/AndroidManifest.xml",
            "<manifest/>",
            Platform::AndroidJava,
            Platform::IosSwift,
        );
        assert!(p.contains("Info.plist"));
    }
}
