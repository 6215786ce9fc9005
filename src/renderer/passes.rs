//! Render passes
//!
//! Each pass walks the same sorted draw list:
//!
//! | Pass      | Depth test   | Depth write | Color | Blend    | Program            |
//! |-----------|--------------|-------------|-------|----------|--------------------|
//! | Depth     | `Less`       | on          | none  | off      | depth-only, forced |
//! | Ambient   | `LessEqual`  | off         | RGBA  | off      | per material       |
//! | Light     | `Equal`      | off         | RGBA  | one, one | per material       |
//!
//! Programs are only rebound when the material type changes between
//! consecutive entries, which is why the list is sorted by material first.

use glam::Vec3;
use slotmap::SlotMap;

use crate::errors::{Result, SceneError};
use crate::renderer::device::{ClearFlags, GraphicsDevice, PassState, ProgramId, UniformValue};
use crate::renderer::draw_list::{DrawEntry, DrawList};
use crate::renderer::frame::{FramePhase, FrameStats};
use crate::renderer::geometry_buffers::GeometryBuffers;
use crate::renderer::lighting::{FrameLight, LIGHT_BLOCK_BINDING, LIGHT_BLOCK_NAME};
use crate::renderer::shader_library::ShaderLibrary;
use crate::resources::{Material, MaterialType, Mesh};
use crate::scene::MeshKey;

/// Uniform names shared with the shaders.
pub mod uniforms {
    pub const MODEL: &str = "M";
    pub const NORMAL_MATRIX: &str = "NM";
    pub const MVP: &str = "MVP";
    pub const VIEW_POS: &str = "viewPos";

    pub const MATERIAL_AMBIENT: &str = "material.ambient";
    pub const MATERIAL_DIFFUSE: &str = "material.diffuse";
    pub const MATERIAL_SPECULAR: &str = "material.specular";
    pub const MATERIAL_SHININESS: &str = "material.shininess";

    pub const LIGHT_POSITION: &str = "light.position";
    pub const LIGHT_DIFFUSE: &str = "light.diffuse";
    pub const LIGHT_SPECULAR: &str = "light.specular";
    pub const LIGHT_KC: &str = "light.kc";
    pub const LIGHT_KL: &str = "light.kl";
    pub const LIGHT_KQ: &str = "light.kq";
    pub const LIGHT_CUTOFF: &str = "light.cutoff";

    pub const LIGHT_COUNT: &str = "lightCount";
}

/// Everything a pass needs besides the draw list.
pub struct PassContext<'a> {
    pub device: &'a mut dyn GraphicsDevice,
    pub shaders: &'a ShaderLibrary,
    pub meshes: &'a SlotMap<MeshKey, Mesh>,
    pub geometry: &'a GeometryBuffers,
    pub view_position: Vec3,
    pub stats: &'a mut FrameStats,
}

/// Checks that every program and mesh range the frame will touch exists, so a
/// failing frame issues no draw commands at all.
pub fn validate(
    list: &DrawList,
    shaders: &ShaderLibrary,
    geometry: &GeometryBuffers,
    scene_name: &str,
) -> Result<()> {
    shaders.program_for(MaterialType::DepthOnly)?;
    let mut checked: Option<MaterialType> = None;
    for entry in list {
        if checked != Some(entry.material) {
            shaders.program_for(entry.material)?;
            checked = Some(entry.material);
        }
        if geometry.range(entry.mesh).is_none() {
            log::error!("Scene '{scene_name}' has meshes added after the last compile");
            return Err(SceneError::NotCompiled(scene_name.to_owned()));
        }
    }
    Ok(())
}

// ============================================================================
// Depth pre-pass
// ============================================================================

/// Fills the depth buffer with one shared depth-only program.
pub fn depth_prepass(ctx: &mut PassContext<'_>, list: &DrawList) -> Result<()> {
    ctx.stats.enter(FramePhase::DepthPrePass);
    ctx.stats.passes += 1;

    ctx.device.set_pass_state(&PassState::DEPTH_PREPASS);
    ctx.device.clear(ClearFlags::DEPTH);
    ctx.device.bind_vertex_array(ctx.geometry.vertex_array());

    let program = ctx.shaders.program_for(MaterialType::DepthOnly)?;
    bind_program(ctx, program);

    for entry in list {
        set_matrices(ctx.device, program, entry);
        draw(ctx, entry);
    }
    Ok(())
}

// ============================================================================
// Ambient pass
// ============================================================================

/// Writes the ambient term of every entry. Light terms are zeroed.
pub fn ambient_pass(ctx: &mut PassContext<'_>, list: &DrawList, light_buffer: bool) -> Result<()> {
    ctx.stats.enter(FramePhase::AmbientPass);
    ctx.stats.passes += 1;

    ctx.device.set_pass_state(&PassState::AMBIENT);
    ctx.device.clear(ClearFlags::COLOR);

    let mut current: Option<(MaterialType, ProgramId)> = None;
    for entry in list {
        let program = match current {
            Some((material, program)) if material == entry.material => program,
            _ => {
                let program = ctx.shaders.program_for(entry.material)?;
                bind_program(ctx, program);
                ctx.device
                    .set_uniform(program, uniforms::VIEW_POS, UniformValue::Vec3(ctx.view_position));
                if light_buffer {
                    ctx.device.set_uniform(program, uniforms::LIGHT_COUNT, UniformValue::I32(0));
                } else {
                    set_light_uniforms(ctx.device, program, None);
                }
                current = Some((entry.material, program));
                program
            }
        };

        set_matrices(ctx.device, program, entry);
        if let Some(mesh) = ctx.meshes.get(entry.mesh) {
            set_material(ctx.device, program, &ambient_only(&mesh.material));
        }
        draw(ctx, entry);
    }
    Ok(())
}

// ============================================================================
// Light passes
// ============================================================================

/// Adds one light's contribution over the whole list.
pub fn forward_light_pass(ctx: &mut PassContext<'_>, list: &DrawList, light: &FrameLight) -> Result<()> {
    ctx.stats.enter(FramePhase::LightPass);
    ctx.stats.passes += 1;

    ctx.device.set_pass_state(&PassState::ADDITIVE_LIGHT);

    let mut current: Option<(MaterialType, ProgramId)> = None;
    for entry in list {
        let program = match current {
            Some((material, program)) if material == entry.material => program,
            _ => {
                let program = ctx.shaders.program_for(entry.material)?;
                bind_program(ctx, program);
                ctx.device
                    .set_uniform(program, uniforms::VIEW_POS, UniformValue::Vec3(ctx.view_position));
                set_light_uniforms(ctx.device, program, Some(light));
                current = Some((entry.material, program));
                program
            }
        };

        set_matrices(ctx.device, program, entry);
        if let Some(mesh) = ctx.meshes.get(entry.mesh) {
            set_material(ctx.device, program, &lit_only(&mesh.material));
        }
        draw(ctx, entry);
    }
    Ok(())
}

/// Adds every packed light in one submission.
///
/// The light block must already be uploaded and bound to
/// [`LIGHT_BLOCK_BINDING`].
pub fn light_buffer_pass(ctx: &mut PassContext<'_>, list: &DrawList, light_count: usize) -> Result<()> {
    ctx.stats.enter(FramePhase::LightPass);
    ctx.stats.passes += 1;

    ctx.device.set_pass_state(&PassState::ADDITIVE_LIGHT);

    let mut current: Option<(MaterialType, ProgramId)> = None;
    for entry in list {
        let program = match current {
            Some((material, program)) if material == entry.material => program,
            _ => {
                let program = ctx.shaders.program_for(entry.material)?;
                bind_program(ctx, program);
                ctx.device.bind_uniform_block(program, LIGHT_BLOCK_NAME, LIGHT_BLOCK_BINDING);
                ctx.device
                    .set_uniform(program, uniforms::VIEW_POS, UniformValue::Vec3(ctx.view_position));
                ctx.device.set_uniform(
                    program,
                    uniforms::LIGHT_COUNT,
                    UniformValue::I32(light_count as i32),
                );
                current = Some((entry.material, program));
                program
            }
        };

        set_matrices(ctx.device, program, entry);
        if let Some(mesh) = ctx.meshes.get(entry.mesh) {
            set_material(ctx.device, program, &lit_only(&mesh.material));
        }
        draw(ctx, entry);
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn bind_program(ctx: &mut PassContext<'_>, program: ProgramId) {
    ctx.device.use_program(program);
    ctx.stats.program_binds += 1;
}

fn draw(ctx: &mut PassContext<'_>, entry: &DrawEntry) {
    let Some(range) = ctx.geometry.range(entry.mesh) else {
        return;
    };
    ctx.device
        .draw_indexed_base_vertex(range.index_count, range.index_offset, range.base_vertex);
    ctx.stats.draw_calls += 1;
}

fn set_matrices(device: &mut dyn GraphicsDevice, program: ProgramId, entry: &DrawEntry) {
    device.set_uniform(program, uniforms::MODEL, UniformValue::Mat4(entry.model));
    device.set_uniform(program, uniforms::NORMAL_MATRIX, UniformValue::Mat3(entry.normal));
    device.set_uniform(program, uniforms::MVP, UniformValue::Mat4(entry.mvp));
}

fn set_material(device: &mut dyn GraphicsDevice, program: ProgramId, material: &Material) {
    device.set_uniform(program, uniforms::MATERIAL_AMBIENT, UniformValue::Vec3(material.ambient));
    device.set_uniform(program, uniforms::MATERIAL_DIFFUSE, UniformValue::Vec3(material.diffuse));
    device.set_uniform(program, uniforms::MATERIAL_SPECULAR, UniformValue::Vec3(material.specular));
    device.set_uniform(program, uniforms::MATERIAL_SHININESS, UniformValue::F32(material.shininess));
}

/// `None` uploads a black light.
fn set_light_uniforms(device: &mut dyn GraphicsDevice, program: ProgramId, light: Option<&FrameLight>) {
    let (position, diffuse, specular, kc, kl, kq, cutoff) = match light {
        Some(l) => (
            l.position,
            l.diffuse,
            l.specular,
            l.attenuation.constant,
            l.attenuation.linear,
            l.attenuation.quadratic,
            l.cutoff,
        ),
        None => (Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, 1.0, 0.0, 0.0, 0.0),
    };
    device.set_uniform(program, uniforms::LIGHT_POSITION, UniformValue::Vec3(position));
    device.set_uniform(program, uniforms::LIGHT_DIFFUSE, UniformValue::Vec3(diffuse));
    device.set_uniform(program, uniforms::LIGHT_SPECULAR, UniformValue::Vec3(specular));
    device.set_uniform(program, uniforms::LIGHT_KC, UniformValue::F32(kc));
    device.set_uniform(program, uniforms::LIGHT_KL, UniformValue::F32(kl));
    device.set_uniform(program, uniforms::LIGHT_KQ, UniformValue::F32(kq));
    device.set_uniform(program, uniforms::LIGHT_CUTOFF, UniformValue::F32(cutoff));
}

/// Material terms for the ambient pass: diffuse and specular zeroed.
fn ambient_only(material: &Material) -> Material {
    Material {
        diffuse: Vec3::ZERO,
        specular: Vec3::ZERO,
        shininess: 1.0,
        ..material.clone()
    }
}

/// Material terms for the light passes: ambient zeroed.
fn lit_only(material: &Material) -> Material {
    Material {
        ambient: Vec3::ZERO,
        ..material.clone()
    }
}
