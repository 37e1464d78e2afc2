//! Turns a scene description into one or two `.dae` files plus a texture
//! directory.
//!
//! The standard document is always written. If asked for, a second,
//! Blender-compatible document is written next to it, but only when the
//! first pass found something that actually needs rearranging.

pub mod collada;
mod textures;

use cli::Args;
use errors::{ErrorKind, Result};
use scene::{self, Scene, SceneIndex};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use time;

pub use self::collada::{Document, GenOptions, Mode};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Stage {
    Standard,
    CompatibilityRewrite,
    Done,
}

/// Generate the documents for `scene`, handing each one to `save` as soon
/// as its pass is done. The standard document is saved before the
/// compatibility pass starts, so a failure there loses only the second
/// document.
pub fn generate<F>(scene: &Scene, opts: &GenOptions, compat_enabled: bool, mut save: F) -> Result<()>
where F: FnMut(Document) -> Result<()> {
    let index = SceneIndex::build(scene)?;

    let mut stage = Stage::Standard;
    while stage != Stage::Done {
        stage = match stage {
            Stage::Standard => {
                let doc = collada::write(scene, &index, Mode::Standard, opts)?;
                let compat_needed = doc.compat_needed;
                save(doc)?;
                match (compat_enabled, compat_needed) {
                    (true, true) => Stage::CompatibilityRewrite,
                    (true, false) => {
                        info!("nothing in the scene needs rearranging for Blender; \
                            not writing a Blender file");
                        Stage::Done
                    }
                    (false, _) => Stage::Done,
                }
            }
            Stage::CompatibilityRewrite => {
                save(collada::write(scene, &index, Mode::Compat, opts)?)?;
                Stage::Done
            }
            Stage::Done => Stage::Done,
        };
    }
    Ok(())
}

/// Write `doc` to `output`, or to its `_blender` sibling for a
/// compatibility document.
fn save_document(doc: &Document, output: &Path) -> Result<()> {
    let path = match doc.mode {
        Mode::Standard => output.to_path_buf(),
        Mode::Compat => compat_path(output),
    };
    let mut f = File::create(&path)?;
    f.write_all(doc.xml.as_bytes())?;
    info!("wrote {}", path.display());
    Ok(())
}

pub fn main(args: &Args) -> Result<()> {
    if !args.input.is_file() {
        bail!(ErrorKind::InputNotFound(args.input.display().to_string()));
    }
    let output = output_path(&args.input, args.output.as_ref().map(|p| p.as_path()))?;

    let scene = scene::load::load(&args.input)?;
    info!("loaded {}: {} nodes, {} bones, {} materials",
        args.input.display(), scene.nodes.len(), scene.bones.len(), scene.materials.len());

    let base_name = output.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let texture_dir = format!("{}_Textures", base_name);

    let now = time::now_utc();
    let timestamp = time::strftime("%FT%TZ", &now)?;

    let opts = GenOptions {
        ignore_empty: args.ignore_empty,
        texture_dir: texture_dir.clone(),
        timestamp,
    };

    generate(&scene, &opts, args.compat_output, |doc| save_document(&doc, &output))?;

    let num_textures = textures::export(&scene, output.with_file_name(&texture_dir))?;
    if num_textures != 0 {
        info!("exported {} texture{} to {}", num_textures,
            if num_textures != 1 { "s" } else { "" }, texture_dir);
    }

    Ok(())
}

/// Where the standard document goes. Defaults to the input's name with a
/// `.dae` extension in the current directory.
fn output_path(input: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let output = match output {
        Some(output) => output.to_path_buf(),
        None => {
            let stem = match input.file_stem() {
                Some(stem) => stem,
                None => bail!(ErrorKind::InvalidOutputPath(input.display().to_string())),
            };
            return Ok(PathBuf::from(stem).with_extension("dae"));
        }
    };

    match output.file_name() {
        Some(name) if !name.is_empty() => (),
        _ => bail!(ErrorKind::InvalidOutputPath(output.display().to_string())),
    }
    if let Some(dir) = output.parent() {
        if !dir.as_os_str().is_empty() && !dir.is_dir() {
            bail!(ErrorKind::OutputDirNotFound(dir.display().to_string()));
        }
    }
    Ok(output)
}

/// `foo.dae` -> `foo_blender.dae`
fn compat_path(output: &Path) -> PathBuf {
    let stem = output.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{}_blender.{}", stem, ext.to_string_lossy()),
        None => format!("{}_blender", stem),
    };
    output.with_file_name(name)
}

#[test]
fn test_compat_path() {
    assert_eq!(compat_path(Path::new("out/model.dae")), PathBuf::from("out/model_blender.dae"));
    assert_eq!(compat_path(Path::new("model")), PathBuf::from("model_blender"));
    assert_eq!(compat_path(Path::new("a.b.dae")), PathBuf::from("a.b_blender.dae"));
}

#[test]
fn test_output_path() {
    let input = Path::new("scenes/hero.json");
    assert_eq!(output_path(input, None).unwrap(), PathBuf::from("hero.dae"));
    assert_eq!(
        output_path(input, Some(Path::new("hero_out.dae"))).unwrap(),
        PathBuf::from("hero_out.dae"),
    );

    let err = output_path(input, Some(Path::new("no/such/dir/hero.dae"))).unwrap_err();
    match *err.kind() {
        ErrorKind::OutputDirNotFound(_) => (),
        _ => panic!("unexpected error: {}", err),
    }
    assert!(err.is_user_error());

    let err = output_path(input, Some(Path::new(".."))).unwrap_err();
    match *err.kind() {
        ErrorKind::InvalidOutputPath(_) => (),
        _ => panic!("unexpected error: {}", err),
    }
}

/// Run `generate` and keep every document it produces.
#[cfg(test)]
fn generate_all(scene: &Scene, compat_enabled: bool) -> (Vec<Document>, Result<()>) {
    let mut docs = vec![];
    let res = generate(scene, &collada::test_options(), compat_enabled, |doc| {
        docs.push(doc);
        Ok(())
    });
    (docs, res)
}

#[test]
fn test_single_pass_without_compat() {
    use scene::fixtures;

    let (docs, res) = generate_all(&fixtures::sword_in_hand(), false);
    res.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].mode, Mode::Standard);
    assert!(docs[0].compat_needed);
}

#[test]
fn test_compat_pass_skipped_when_not_needed() {
    use scene::fixtures;

    let (docs, res) = generate_all(&fixtures::skinned_arm(), true);
    res.unwrap();
    assert_eq!(docs.len(), 1);
}

#[test]
fn test_two_passes() {
    use scene::fixtures;

    let (docs, res) = generate_all(&fixtures::sword_in_hand(), true);
    res.unwrap();
    assert_eq!(docs.iter().map(|d| d.mode).collect::<Vec<_>>(), vec![Mode::Standard, Mode::Compat]);
    assert!(docs[0].xml.contains("<instance_geometry"));
    assert!(docs[1].xml.contains(r##"<instance_controller url="#meshId0-skin">"##));
}

#[test]
fn test_failed_compat_pass_keeps_standard_document() {
    use scene::{fixtures, Attachment};
    use std::{env, fs, process};

    let mut scene = fixtures::sword_in_hand();
    if let Attachment::Mesh(ref mut mesh) = scene.nodes[3].attachments[0] {
        mesh.weights = Some(vec![fixtures::weight(&[(0, 1.0)]); 4]);
    }

    let (docs, res) = generate_all(&scene, true);
    match *res.unwrap_err().kind() {
        ErrorKind::JointAttachmentWeighted(ref node) => assert_eq!(node, "sword"),
        ref kind => panic!("unexpected error: {}", kind),
    }
    assert_eq!(docs.iter().map(|d| d.mode).collect::<Vec<_>>(), vec![Mode::Standard]);

    let dir = env::temp_dir().join(format!("skin2dae-compat-{}", process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    let output = dir.join("hero.dae");

    let res = generate(&scene, &collada::test_options(), true, |doc| save_document(&doc, &output));
    assert!(res.is_err());
    assert!(output.is_file());
    assert!(!dir.join("hero_blender.dae").exists());

    fs::remove_dir_all(&dir).unwrap();
}
