//! `<library_images>`, `<library_effects>` and `<library_materials>`.
//!
//! Every texture map a material has becomes an image, a surface and a
//! sampler. The Phong technique only samples the glow, diffuse and specular
//! maps; the others are declared so they survive the round trip into a DCC
//! tool.

use cgmath::Vector4;
use scene::{self, MapKind, Material};
use super::Ctx;
use super::xml::{Esc, Xml};

/// The maps of `mat` that should be written, in output order.
fn present_maps<'a>(mat: &'a Material) -> Vec<(MapKind, &'a str)> {
    MapKind::ALL.iter()
        .filter(|&&kind| mat.flags.has(kind))
        .filter_map(|&kind| match mat.map(kind) {
            Some(texture) if scene::is_plain_file_name(texture) => Some((kind, texture)),
            Some(texture) => {
                // Not exported, so nothing to point an image at.
                warn!("material {} has a {} map {:?} that can't be exported; ignoring it",
                    mat.name, kind.name(), texture);
                None
            }
            None => {
                warn!("material {} has a {} map flag but no texture; ignoring it",
                    mat.name, kind.name());
                None
            }
        })
        .collect()
}

pub fn library_images(xml: &mut Xml, ctx: &Ctx) {
    xml!(xml;
        <library_images>;
    );
    for mat in &ctx.scene.materials {
        for (kind, texture) in present_maps(mat) {
            xml!(xml;
                <image id=[(Esc(&mat.name))"-"(kind.name())"-image"]>;
                    <init_from>(Esc(&ctx.opts.texture_dir))"/"(Esc(texture))</init_from>;
                /image>;
            );
        }
    }
    xml!(xml;
        /library_images>;
    );
}

pub fn library_effects(xml: &mut Xml, ctx: &Ctx) {
    xml!(xml;
        <library_effects>;
    );
    for mat in &ctx.scene.materials {
        effect(xml, mat);
    }
    xml!(xml;
        /library_effects>;
    );
}

fn effect(xml: &mut Xml, mat: &Material) {
    let maps = present_maps(mat);
    let name = Esc(&mat.name);

    xml!(xml;
        <effect id=[(name)"-fx"] name=[(name)]>;
            <profile_COMMON>;
    );

    for &(kind, _) in &maps {
        xml!(xml;
            <newparam sid=[(name)"-"(kind.name())"-surface"]>;
                <surface type=["2D"]>;
                    <init_from>(name)"-"(kind.name())"-image"</init_from>;
                /surface>;
            /newparam>;
            <newparam sid=[(name)"-"(kind.name())"-sampler"]>;
                <sampler2D>;
                    <source>(name)"-"(kind.name())"-surface"</source>;
                /sampler2D>;
            /newparam>;
        );
    }

    let has = |kind: MapKind| maps.iter().any(|&(k, _)| k == kind);

    xml!(xml;
        <technique sid=["standard"]>;
            <phong>;
    );
    phong_channel(xml, mat, "emission", MapKind::Glow, has(MapKind::Glow), &mat.emissive);
    phong_color(xml, "ambient", &mat.ambient);
    phong_channel(xml, mat, "diffuse", MapKind::Diffuse, has(MapKind::Diffuse), &mat.diffuse);
    phong_channel(xml, mat, "specular", MapKind::Specular, has(MapKind::Specular), &mat.specular);
    xml!(xml;
            /phong>;
        /technique>;
    );

    xml!(xml;
            /profile_COMMON>;
        /effect>;
    );
}

/// A Phong channel that samples `kind`'s map if there is one, and falls
/// back to a flat color otherwise.
fn phong_channel(
    xml: &mut Xml,
    mat: &Material,
    channel: &str,
    kind: MapKind,
    textured: bool,
    color: &Vector4<f32>,
) {
    if !textured {
        phong_color(xml, channel, color);
        return;
    }
    xml!(xml;
        <(channel)>;
            <texture texture=[(Esc(&mat.name))"-"(kind.name())"-sampler"] texcoord=["CHANNEL0"]/>;
        /(channel)>;
    );
}

fn phong_color(xml: &mut Xml, channel: &str, color: &Vector4<f32>) {
    xml!(xml;
        <(channel)>;
            <color sid=[(channel)]>(color.x)" "(color.y)" "(color.z)" "(color.w)</color>;
        /(channel)>;
    );
}

pub fn library_materials(xml: &mut Xml, ctx: &Ctx) {
    xml!(xml;
        <library_materials>;
        for mat in (&ctx.scene.materials) {
            <material id=[(Esc(&mat.name))] name=[(Esc(&mat.name))]>;
                <instance_effect url=["#"(Esc(&mat.name))"-fx"]/>;
            /material>;
        }
        /library_materials>;
    );
}

#[test]
fn test_effects() {
    use convert::collada::test_ctx;
    use scene::fixtures;

    let mut scene = fixtures::plain_prop();
    {
        let mat = &mut scene.materials[0];
        mat.set_map(MapKind::Diffuse, "body_d.dds");
        mat.set_map(MapKind::Night, "body_n.dds");
    }
    let out = test_ctx(&scene, |ctx| {
        let mut xml = Xml::with_capacity(4096);
        library_images(&mut xml, ctx);
        library_effects(&mut xml, ctx);
        library_materials(&mut xml, ctx);
        xml.string()
    });

    assert!(out.contains(r#"<image id="body-diffuse-image">"#));
    assert!(out.contains("<init_from>scene_Textures/body_d.dds</init_from>"));
    assert!(out.contains(r#"<image id="body-night-image">"#));
    assert!(!out.contains("body-glow"));

    // Night maps are declared but only diffuse is sampled.
    assert!(out.contains(r#"<newparam sid="body-night-sampler">"#));
    assert!(out.contains(r#"<texture texture="body-diffuse-sampler" texcoord="CHANNEL0"/>"#));
    assert!(!out.contains(r#"texture="body-night-sampler""#));
    assert!(out.contains(r#"<color sid="emission">0 0 0 1</color>"#));
    assert!(out.contains(r#"<color sid="specular">0 0 0 1</color>"#));

    assert!(out.contains(r##"<instance_effect url="#body-fx"/>"##));

    // Images come out in the fixed map order.
    let diffuse = out.find("body-diffuse-image").unwrap();
    let night = out.find("body-night-image").unwrap();
    assert!(diffuse < night);
}

#[test]
fn test_flag_without_texture_is_skipped() {
    use scene::MaterialFlags;

    let mut mat = Material::new("m");
    mat.flags = MaterialFlags(!0);
    mat.set_map(MapKind::Shadow, "s.dds");
    let maps = present_maps(&mat);
    assert_eq!(maps, vec![(MapKind::Shadow, "s.dds")]);
}

#[test]
fn test_unexportable_texture_is_skipped() {
    use convert::collada::test_ctx;
    use scene::fixtures;

    let mut scene = fixtures::plain_prop();
    {
        let mat = &mut scene.materials[0];
        mat.set_map(MapKind::Diffuse, "../body_d.dds");
        mat.set_map(MapKind::Specular, "body_s.dds");
    }
    assert_eq!(present_maps(&scene.materials[0]), vec![(MapKind::Specular, "body_s.dds")]);

    let out = test_ctx(&scene, |ctx| {
        let mut xml = Xml::with_capacity(4096);
        library_images(&mut xml, ctx);
        library_effects(&mut xml, ctx);
        xml.string()
    });
    assert!(!out.contains("body_d.dds"));
    assert!(!out.contains("body-diffuse"));
    assert!(out.contains(r#"<color sid="diffuse">"#));
    assert!(out.contains("<init_from>scene_Textures/body_s.dds</init_from>"));
}
