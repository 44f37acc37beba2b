//! Identifier table: keyword text -> stable numeric id.
//!
//! The table is built once and shared read-only by the AST builder (and,
//! downstream, the emitter). Id `0` means "not a keyword".

use std::collections::HashMap;

pub const ID_NONE: u32 = 0;

pub const ID_MATERIAL: u32 = 1;
pub const ID_TECHNIQUE: u32 = 2;
pub const ID_PASS: u32 = 3;
pub const ID_TEXTURE_UNIT: u32 = 4;
pub const ID_TEXTURE_SOURCE: u32 = 5;
pub const ID_PARTICLE_SYSTEM: u32 = 6;
pub const ID_EMITTER: u32 = 7;
pub const ID_AFFECTOR: u32 = 8;
pub const ID_COMPOSITOR: u32 = 9;
pub const ID_GPU_PROGRAM: u32 = 10;
pub const ID_GPU_CBUFFER: u32 = 11;
pub const ID_SAMPLER: u32 = 12;

/// Built-in keyword vocabulary. A keyword's id is its position + 1, so the
/// structural classes above must stay first and in this order.
const KEYWORDS: &[&str] = &[
    // structural classes
    "material",
    "technique",
    "pass",
    "texture_unit",
    "texture_source",
    "particle_system",
    "emitter",
    "affector",
    "compositor",
    "gpu_program",
    "gpu_cbuffer",
    "sampler",
    // references and program kinds
    "gpu_program_ref",
    "gpu_cbuffer_ref",
    "sampler_ref",
    "vertex_program",
    "fragment_program",
    "geometry_program",
    "compute_program",
    "vertex_program_ref",
    "fragment_program_ref",
    "geometry_program_ref",
    "compute_program_ref",
    "shadow_caster_material",
    "shadow_receiver_material",
    "shadow_caster_vertex_program_ref",
    "shadow_caster_fragment_program_ref",
    "shadow_receiver_vertex_program_ref",
    "shadow_receiver_fragment_program_ref",
    "target",
    "compositor_logic",
    "texture_ref",
    "shared_params",
    "shared_params_ref",
    "shared_param_named",
    // booleans
    "on",
    "off",
    "true",
    "false",
    "yes",
    "no",
    // material properties
    "lod_values",
    "lod_strategy",
    "lod_distances",
    "receive_shadows",
    "transparency_casts_shadows",
    "set_texture_alias",
    "scheme",
    "lod_index",
    "render_queue",
    // program properties
    "source",
    "entry_point",
    "stage",
    "syntax",
    "default_params",
    "param_indexed",
    "param_named",
    "param_indexed_auto",
    "param_named_auto",
    "slot",
    "subroutine",
    "thread_groups",
    // pass properties
    "ambient",
    "diffuse",
    "specular",
    "emissive",
    "vertexcolour",
    "scene_blend",
    "separate_scene_blend",
    "scene_blend_op",
    "depth_check",
    "depth_write",
    "depth_func",
    "depth_bias",
    "alpha_rejection",
    "alpha_to_coverage",
    "cull_hardware",
    "cull_software",
    "lighting",
    "shading",
    "polygon_mode",
    "fog_override",
    "colour_write",
    "max_lights",
    "start_light",
    "iteration",
    "point_size",
    "point_sprites",
    "line_width",
    "stencil_value",
    "check",
    "comp_func",
    "ref_value",
    "mask",
    "fail_op",
    "depth_fail_op",
    "pass_op",
    "two_sided",
    "read_back_as_texture",
    // texture unit properties
    "texture_alias",
    "texture",
    "anim_texture",
    "cubic_texture",
    "tex_coord_set",
    "tex_address_mode",
    "tex_border_colour",
    "filtering",
    "max_anisotropy",
    "mipmap_bias",
    "colour_op",
    "colour_op_ex",
    "alpha_op_ex",
    "env_map",
    "scroll",
    "scroll_anim",
    "rotate",
    "rotate_anim",
    "scale",
    "wave_xform",
    "transform",
    "binding_type",
    "content_type",
    // enumerated values
    "one",
    "zero",
    "dest_colour",
    "src_colour",
    "one_minus_dest_colour",
    "one_minus_src_colour",
    "dest_alpha",
    "src_alpha",
    "one_minus_dest_alpha",
    "one_minus_src_alpha",
    "add",
    "modulate",
    "replace",
    "subtract",
    "reverse_subtract",
    "min",
    "max",
    "alpha_blend",
    "always_fail",
    "always_pass",
    "less",
    "less_equal",
    "equal",
    "not_equal",
    "greater_equal",
    "greater",
    "keep",
    "increment",
    "decrement",
    "increment_wrap",
    "decrement_wrap",
    "invert",
    "clockwise",
    "anticlockwise",
    "none",
    "back",
    "front",
    "flat",
    "gouraud",
    "phong",
    "solid",
    "wireframe",
    "points",
    "once",
    "once_per_light",
    "per_light",
    "per_n_lights",
    "point",
    "spot",
    "directional",
    "wrap",
    "clamp",
    "mirror",
    "border",
    "bilinear",
    "trilinear",
    "anisotropic",
    "linear",
    "1d",
    "2d",
    "3d",
    "cubic",
    "2darray",
    "vertex",
    "fragment",
    "named",
    "shadow",
    "input",
    "previous",
    "pooled",
    "gamma",
];

/// Read-only keyword table.
#[derive(Debug, Clone, Default)]
pub struct IdTable {
    ids: HashMap<String, u32>,
}

impl IdTable {
    /// The built-in material/program/particle/compositor vocabulary.
    pub fn builtin() -> Self {
        let ids = KEYWORDS
            .iter()
            .enumerate()
            .map(|(i, kw)| ((*kw).to_owned(), i as u32 + 1))
            .collect();
        IdTable { ids }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        IdTable {
            ids: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, word: &str) -> Option<u32> {
        self.ids.get(word).copied()
    }

    /// Keyword id, or [`ID_NONE`] for ordinary text.
    pub fn id_of(&self, word: &str) -> u32 {
        self.get(word).unwrap_or(ID_NONE)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
