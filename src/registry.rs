//! ShaderRegistry: shaders loaded from a `ShaderSource`, looked up by file
//! name.
//!
//! The registry is an ordinary value owned by whoever drives rendering;
//! several can coexist. It owns the shaders it creates and destroys them
//! in `shutdown`, or when a name is registered again.

use crate::arena::Handle;
use crate::bucket_map::BucketMap;
use crate::config::ResourceConfig;
use crate::gpu::GpuBackend;
use crate::resource::shader::{Shader, ShaderStage};
use crate::resource::ResourceError;
use crate::shader_source::ShaderSource;
use crate::system::ResourceSystem;
use std::path::Path;

const DEFAULT_BUCKET_CAPACITY: usize = 4;
const DEFAULT_MAX_LOAD_FACTOR: f64 = 4.0;

#[derive(Debug)]
pub struct ShaderRegistry {
    shaders: BucketMap<String, Handle<Shader>>,
    max_load_factor: f64,
}

impl ShaderRegistry {
    /// Panics if `bucket_count` is zero.
    pub fn new(bucket_count: usize) -> Self {
        Self {
            shaders: BucketMap::new(bucket_count, DEFAULT_BUCKET_CAPACITY),
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
        }
    }

    pub fn from_config(config: &ResourceConfig) -> Self {
        Self {
            shaders: BucketMap::new(config.shader_buckets, config.bucket_initial_capacity),
            max_load_factor: config.max_load_factor,
        }
    }

    /// Load every recognized shader file under `root`.
    ///
    /// The stage comes from the extension (`vert`, `frag`, `comp`, `geom`,
    /// `tesc`, `tese`, optionally followed by `.spv`); other files are
    /// skipped. Returns how many shaders were loaded.
    pub fn init<B: GpuBackend>(
        &mut self,
        sys: &mut ResourceSystem<B>,
        source: &dyn ShaderSource,
        root: &Path,
    ) -> Result<usize, ResourceError> {
        let mut loaded = 0;
        for path in source.list(root)? {
            let Some(stage) = ShaderStage::from_path(&path) else {
                log::debug!("skipping {}: not a shader file", path.display());
                continue;
            };
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                log::debug!("skipping {}: file name is not UTF-8", path.display());
                continue;
            };
            let code = source.read(&path)?;
            self.register(sys, name, stage, &code)?;
            loaded += 1;
        }
        log::debug!(
            "loaded {} shader(s) from {} ({} buckets, load factor {:.2})",
            loaded,
            root.display(),
            self.shaders.bucket_count(),
            self.shaders.load_factor()
        );
        Ok(loaded)
    }

    /// Create a shader and store it under `name`, destroying any shader
    /// previously stored there.
    pub fn register<B: GpuBackend>(
        &mut self,
        sys: &mut ResourceSystem<B>,
        name: &str,
        stage: ShaderStage,
        code: &[u8],
    ) -> Result<Handle<Shader>, ResourceError> {
        let handle = sys.create_shader(name, stage, code)?;
        if let Some(old) = self.shaders.insert(name.to_string(), handle) {
            log::debug!("replacing shader {}", name);
            Self::destroy(sys, name, old)?;
        }
        if self.shaders.load_factor() > self.max_load_factor {
            log::warn!(
                "shader registry load factor {:.2} exceeds {:.2} (longest bucket {}); \
                 consider more shader buckets",
                self.shaders.load_factor(),
                self.max_load_factor,
                self.shaders.longest_bucket()
            );
        }
        Ok(handle)
    }

    /// Stale handles mean the shader was already destroyed elsewhere.
    fn destroy<B: GpuBackend>(
        sys: &mut ResourceSystem<B>,
        name: &str,
        handle: Handle<Shader>,
    ) -> Result<(), ResourceError> {
        match sys.destroy_shader(handle) {
            Err(e) if e.is_stale_handle() => {
                log::warn!("shader {} was destroyed outside the registry", name);
                Ok(())
            }
            other => other,
        }
    }

    pub fn get(&self, name: &str) -> Option<Handle<Shader>> {
        self.shaders.get(name).copied()
    }

    /// Panics if no shader is registered under `name`.
    pub fn shader(&self, name: &str) -> Handle<Shader> {
        match self.get(name) {
            Some(h) => h,
            None => {
                log::error!("no shader registered as {}", name);
                panic!("no shader registered as {}", name);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shaders.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.shaders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn load_factor(&self) -> f64 {
        self.shaders.load_factor()
    }

    /// Destroy every registered shader and empty the registry. Keeps going
    /// past failures and returns the first one.
    pub fn shutdown<B: GpuBackend>(
        &mut self,
        sys: &mut ResourceSystem<B>,
    ) -> Result<(), ResourceError> {
        let entries: Vec<(String, Handle<Shader>)> = self
            .shaders
            .iter()
            .map(|(name, h)| (name.clone(), *h))
            .collect();
        self.shaders.clear();

        let mut first = None;
        for (name, handle) in entries {
            if let Err(e) = Self::destroy(sys, &name, handle) {
                log::error!("failed to destroy shader {}: {}", name, e);
                first.get_or_insert(e);
            }
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
