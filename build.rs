fn main() {
    #[cfg(target_os = "windows")]
    {
        let icon_path = std::path::Path::new("resources/windows/openconnect-ui.ico");
        let rc_path = std::path::Path::new("resources/windows/openconnect-ui.rc");

        if icon_path.exists() && rc_path.exists() {
            println!("cargo:rerun-if-changed={}", icon_path.display());
            println!("cargo:rerun-if-changed={}", rc_path.display());

            if let Err(error) =
                embed_resource::compile(rc_path, embed_resource::NONE).manifest_optional()
            {
                println!("cargo:warning=Failed to embed Windows resources: {error}");
            }
        } else {
            println!(
                "cargo:warning=No Windows icon at {}; the executable keeps the default icon.",
                icon_path.display()
            );
        }
    }
}
