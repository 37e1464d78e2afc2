//! Copies the scene's textures next to the output, where the documents'
//! `<init_from>` paths expect them.

use errors::Result;
use scene::{self, Scene};
use std::path::PathBuf;
use util::OutDir;

/// Write every texture into `dir`, byte for byte. Returns how many were
/// written.
pub fn export(scene: &Scene, dir: PathBuf) -> Result<usize> {
    let mut out_dir = OutDir::new(dir);
    let mut count = 0;
    for texture in &scene.textures {
        // Materials don't reference these either; see `present_maps`.
        if !scene::is_plain_file_name(&texture.name) {
            warn!("skipping texture with a bad name: {:?}", texture.name);
            continue;
        }
        out_dir.write_file(&texture.name, &texture.data)?;
        count += 1;
    }
    debug!("{} texture(s) in {}", count, out_dir.path().display());
    Ok(count)
}

#[test]
fn test_export() {
    use scene::{fixtures, Texture};
    use std::{env, fs, process};

    let dir = env::temp_dir().join(format!("skin2dae-textures-{}", process::id()));
    let _ = fs::remove_dir_all(&dir);

    let mut scene = fixtures::plain_prop();
    assert_eq!(export(&scene, dir.clone()).unwrap(), 0);
    // Nothing to write, so no directory.
    assert!(!dir.exists());

    scene.textures.push(Texture { name: "body_d.dds".to_string(), data: vec![1, 2, 3] });
    scene.textures.push(Texture { name: "../evil.dds".to_string(), data: vec![4] });
    assert_eq!(export(&scene, dir.clone()).unwrap(), 1);
    assert_eq!(fs::read(dir.join("body_d.dds")).unwrap(), vec![1, 2, 3]);
    assert!(!dir.join("../evil.dds").exists());

    fs::remove_dir_all(&dir).unwrap();
}
