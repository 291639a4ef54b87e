//! System prompts for the two generation modes.

use crate::core_types::Language;

/// System prompt for code generation. Asks for one markdown fence per
/// file with the file name on the first line, which is the shape the
/// extractor is built around.
pub fn code_gen_system_prompt(language: Language) -> String {
    format!(
        "You are an expert {lang} developer. Generate code that fulfils the \
         user's request. If more than one file is needed, output each file in \
         its own markdown code block tagged `{lang}`, and put the file name \
         in a comment on the first line of the block, e.g. `// main.go`.",
        lang = language.as_str()
    )
}

/// System prompt for unit-test generation.
pub fn test_gen_system_prompt(language: Language) -> String {
    format!(
        "You are an expert {lang} developer. Generate unit tests for the \
         user's request. Output the test code in a single markdown code block \
         tagged `{lang}`, ready to be saved as {file} and run as-is.",
        lang = language.as_str(),
        file = language.test_file_name()
    )
}
