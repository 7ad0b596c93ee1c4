// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extension-based language detection and the media/binary exclusion set.

use std::path::Path;

/// Extensions never indexed (media, archives, compiled artifacts, fonts, documents).
const EXCLUDED_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "svg", "webp", "tiff", "tif", "psd", "heic",
    // audio / video
    "mp3", "wav", "flac", "ogg", "m4a", "aac", "mp4", "mov", "avi", "mkv", "webm", "wmv",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "jar", "war",
    // binaries and build output
    "exe", "dll", "so", "dylib", "a", "o", "obj", "lib", "bin", "class", "pyc", "pyo", "wasm",
    "rlib", "dmg", "iso", "deb", "rpm",
    // fonts
    "ttf", "otf", "woff", "woff2", "eot",
    // documents and data blobs
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "sqlite", "db", "lock",
];

/// `(extension, language)` pairs.
const LANGUAGES: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("py", "python"),
    ("js", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("go", "go"),
    ("java", "java"),
    ("kt", "kotlin"),
    ("swift", "swift"),
    ("c", "c"),
    ("h", "c"),
    ("cc", "cpp"),
    ("cpp", "cpp"),
    ("cxx", "cpp"),
    ("hpp", "cpp"),
    ("cs", "csharp"),
    ("rb", "ruby"),
    ("php", "php"),
    ("scala", "scala"),
    ("lua", "lua"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("zsh", "shell"),
    ("ps1", "powershell"),
    ("sql", "sql"),
    ("html", "html"),
    ("htm", "html"),
    ("css", "css"),
    ("scss", "scss"),
    ("vue", "vue"),
    ("svelte", "svelte"),
    ("md", "markdown"),
    ("markdown", "markdown"),
    ("rst", "restructuredtext"),
    ("txt", "text"),
    ("json", "json"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("toml", "toml"),
    ("xml", "xml"),
    ("ini", "ini"),
    ("cfg", "ini"),
    ("dockerfile", "dockerfile"),
    ("proto", "protobuf"),
    ("graphql", "graphql"),
];

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Whether the file's extension is in the media/binary exclusion set.
pub fn is_excluded(path: &Path) -> bool {
    extension(path).is_some_and(|ext| EXCLUDED_EXTENSIONS.contains(&ext.as_str()))
}

/// Language name for a file, `"text"` when the extension is unknown.
pub fn language_for(path: &Path) -> &'static str {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    match file_name {
        "Dockerfile" => return "dockerfile",
        "Makefile" => return "makefile",
        _ => {}
    }
    extension(path)
        .and_then(|ext| LANGUAGES.iter().find(|(e, _)| *e == ext).map(|(_, l)| *l))
        .unwrap_or("text")
}
