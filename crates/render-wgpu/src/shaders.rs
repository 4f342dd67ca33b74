/// Uniform block shared by every pipeline.
const UNIFORMS: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    shadow: mat4x4<f32>,
    // xyz: unit vector toward the light
    light_dir: vec4<f32>,
    ground_color: vec4<f32>,
    sky_color: vec4<f32>,
    // xyz: eye position, w: sky height above the eye
    eye: vec4<f32>,
    // x: shadow intensity, y: textures on, z: sky scroll, w: sky scale
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

fn checker(p: vec2<f32>) -> f32 {
    let cell = floor(p);
    let parity = (i32(cell.x) + i32(cell.y)) & 1;
    return select(1.0, 0.85, parity == 1);
}

fn ground_shade(p: vec2<f32>) -> vec3<f32> {
    let base = uniforms.ground_color.rgb;
    if uniforms.params.y > 0.5 {
        return base * checker(p);
    }
    return base;
}
"#;

/// Per-instance inputs; the model matrix arrives as four columns.
const INSTANCE_INPUT: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
};

fn model_matrix(instance: InstanceInput) -> mat4x4<f32> {
    return mat4x4<f32>(instance.model_0, instance.model_1, instance.model_2, instance.model_3);
}
"#;

const LIT_BODY: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) color: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = model_matrix(instance);
    let world_pos = model * vec4<f32>(vertex.position, 1.0);

    // cofactor of the linear part: normals stay perpendicular under
    // non-uniform scale and the skewed triangle instances
    let c0 = model[0].xyz;
    let c1 = model[1].xyz;
    let c2 = model[2].xyz;
    let normal_matrix = mat3x3<f32>(cross(c1, c2), cross(c2, c0), cross(c0, c1));

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * world_pos;
    out.world_position = world_pos.xyz;
    out.world_normal = normal_matrix * vertex.normal;
    out.color = instance.color;
    return out;
}

fn grain(p: vec3<f32>) -> f32 {
    let cell = floor(p * 24.0);
    let h = fract(sin(dot(cell, vec3<f32>(12.9898, 78.233, 37.719))) * 43758.5453);
    return 0.9 + 0.1 * h;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n_len = length(in.world_normal);
    // lines carry a zero normal and are drawn unlit
    if n_len < 1e-6 {
        return in.color;
    }
    let n = in.world_normal / n_len;
    let diffuse = max(dot(n, uniforms.light_dir.xyz), 0.0);
    var rgb = in.color.rgb * (0.4 + 0.6 * diffuse);
    if uniforms.params.y > 0.5 {
        rgb = rgb * grain(in.world_position);
    }
    return vec4<f32>(rgb, in.color.a);
}
"#;

const SHADOW_BODY: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ground_position: vec2<f32>,
};

// line pipelines take no depth bias
const LINE_SHADOW_LIFT: f32 = 0.001;

fn flatten(vertex: VertexInput, instance: InstanceInput, lift: f32) -> VertexOutput {
    var projected = uniforms.shadow * model_matrix(instance) * vec4<f32>(vertex.position, 1.0);
    projected.z = projected.z + lift * projected.w;
    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * projected;
    out.ground_position = projected.xy;
    return out;
}

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    return flatten(vertex, instance, 0.0);
}

@vertex
fn vs_line(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    return flatten(vertex, instance, LINE_SHADOW_LIFT);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(ground_shade(in.ground_position) * uniforms.params.x, 1.0);
}
"#;

const GROUND_BODY: &str = r#"
struct GroundInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct GroundOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ground_position: vec2<f32>,
};

@vertex
fn vs_main(vertex: GroundInput) -> GroundOutput {
    var out: GroundOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(vertex.position, 1.0);
    out.ground_position = vertex.position.xy;
    return out;
}

@fragment
fn fs_main(in: GroundOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(ground_shade(in.ground_position), 1.0);
}
"#;

const SKY_BODY: &str = r#"
struct SkyInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct SkyOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) texcoord: vec2<f32>,
};

@vertex
fn vs_main(vertex: SkyInput) -> SkyOutput {
    let eye = uniforms.eye;
    let world = vertex.position + vec3<f32>(eye.x, eye.y, eye.z + eye.w);
    var clip = uniforms.view_proj * vec4<f32>(world, 1.0);
    // pinned to the far plane
    clip.z = clip.w;
    var out: SkyOutput;
    out.clip_position = clip;
    out.texcoord = vertex.position.xy * uniforms.params.w + vec2<f32>(uniforms.params.z);
    return out;
}

// period 1 in both axes, so the scroll offset wraps without a seam
fn clouds(uv: vec2<f32>) -> f32 {
    let tau = 6.2831853;
    let a = sin(tau * uv.x) * sin(tau * uv.y);
    let b = sin(tau * (2.0 * uv.x + uv.y)) * 0.5;
    return clamp(0.5 + 0.35 * (a + b), 0.0, 1.0);
}

@fragment
fn fs_main(in: SkyOutput) -> @location(0) vec4<f32> {
    let sky = uniforms.sky_color.rgb;
    if uniforms.params.y > 0.5 {
        return vec4<f32>(mix(sky, vec3<f32>(1.0), 0.5 * clouds(in.texcoord)), 1.0);
    }
    return vec4<f32>(sky, 1.0);
}
"#;

/// Lit, optionally grain-textured instanced geometry.
pub fn lit_shader() -> String {
    format!("{UNIFORMS}{INSTANCE_INPUT}{LIT_BODY}")
}

/// Instanced geometry flattened by the shadow matrix.
pub fn shadow_shader() -> String {
    format!("{UNIFORMS}{INSTANCE_INPUT}{SHADOW_BODY}")
}

/// Ground plane, checkered when textures are on.
pub fn ground_shader() -> String {
    format!("{UNIFORMS}{GROUND_BODY}")
}

/// Scrolling sky plane above the eye.
pub fn sky_shader() -> String {
    format!("{UNIFORMS}{SKY_BODY}")
}
