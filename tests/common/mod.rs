// Common test utilities for pipeline integration tests
//
// `RecordingBackend` wraps the software renderer, logs every call into a log
// that outlives the backend (a pipeline owns and drops its backend), and can
// be told to fail specific calls.

#![allow(dead_code)]

use crt_pipeline::display::backend::software::SoftTexture;
use crt_pipeline::display::{
    RenderBackend, Resolution, SoftwareBackend, TextureDesc, TextureLimits,
};
use crt_pipeline::BackendError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One recorded backend call; textures are identified by label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create {
        label: &'static str,
        size: Resolution,
    },
    Destroy(&'static str),
    Update(&'static str),
    SetTarget(Option<&'static str>),
    Clear,
    Copy(&'static str),
    Present,
    ResizeOutput(Resolution),
    SetFullscreen(bool),
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Calls the backend should fail
#[derive(Debug, Default, Clone)]
pub struct Faults {
    /// Fail creating the texture with this label
    pub create: Option<&'static str>,
    /// Fail copying from the texture with this label
    pub copy_from: Option<&'static str>,
    pub update: bool,
    pub present: bool,
}

fn injected(what: &str) -> BackendError {
    BackendError::Texture(format!("injected {} failure", what))
}

/// Software backend that records and can fail calls
pub struct RecordingBackend {
    inner: SoftwareBackend,
    log: CallLog,
    labels: HashMap<u32, &'static str>,
    pub faults: Faults,
}

impl RecordingBackend {
    pub fn new(output: Resolution) -> (Self, CallLog) {
        Self::wrap(SoftwareBackend::new(output))
    }

    pub fn wrap(inner: SoftwareBackend) -> (Self, CallLog) {
        let log = CallLog::default();
        let backend = Self {
            inner,
            log: log.clone(),
            labels: HashMap::new(),
            faults: Faults::default(),
        };
        (backend, log)
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }

    pub fn inner(&self) -> &SoftwareBackend {
        &self.inner
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }

    fn label(&self, texture: &SoftTexture) -> &'static str {
        self.labels.get(&texture.id()).copied().unwrap_or("<unknown>")
    }
}

impl RenderBackend for RecordingBackend {
    type Texture = SoftTexture;

    fn name(&self) -> String {
        format!("recording {}", self.inner.name())
    }

    fn output_size(&self) -> Resolution {
        self.inner.output_size()
    }

    fn max_texture_size(&self) -> TextureLimits {
        self.inner.max_texture_size()
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<SoftTexture, BackendError> {
        if self.faults.create == Some(desc.label) {
            return Err(injected("create"));
        }
        let texture = self.inner.create_texture(desc)?;
        self.labels.insert(texture.id(), desc.label);
        self.record(Call::Create {
            label: desc.label,
            size: desc.size(),
        });
        Ok(texture)
    }

    fn destroy_texture(&mut self, texture: SoftTexture) {
        self.record(Call::Destroy(self.label(&texture)));
        self.inner.destroy_texture(texture);
    }

    fn update_texture(
        &mut self,
        texture: &SoftTexture,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<(), BackendError> {
        self.record(Call::Update(self.label(texture)));
        if self.faults.update {
            return Err(injected("update"));
        }
        self.inner.update_texture(texture, pixels, pitch)
    }

    fn set_render_target(&mut self, target: Option<&SoftTexture>) -> Result<(), BackendError> {
        self.record(Call::SetTarget(target.map(|t| self.label(t))));
        self.inner.set_render_target(target)
    }

    fn clear(&mut self) -> Result<(), BackendError> {
        self.record(Call::Clear);
        self.inner.clear()
    }

    fn copy(&mut self, source: &SoftTexture) -> Result<(), BackendError> {
        let label = self.label(source);
        self.record(Call::Copy(label));
        if self.faults.copy_from == Some(label) {
            return Err(injected("copy"));
        }
        self.inner.copy(source)
    }

    fn present(&mut self) -> Result<(), BackendError> {
        self.record(Call::Present);
        if self.faults.present {
            return Err(injected("present"));
        }
        self.inner.present()
    }

    fn resize_output(&mut self, size: Resolution) -> Result<(), BackendError> {
        self.record(Call::ResizeOutput(size));
        self.inner.resize_output(size)
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), BackendError> {
        self.record(Call::SetFullscreen(fullscreen));
        self.inner.set_fullscreen(fullscreen)
    }

    fn is_fullscreen(&self) -> bool {
        self.inner.is_fullscreen()
    }
}

/// Labels of textures created, in order
pub fn created(log: &CallLog) -> Vec<&'static str> {
    log.borrow()
        .iter()
        .filter_map(|call| match call {
            Call::Create { label, .. } => Some(*label),
            _ => None,
        })
        .collect()
}

/// Labels of textures destroyed, in order
pub fn destroyed(log: &CallLog) -> Vec<&'static str> {
    log.borrow()
        .iter()
        .filter_map(|call| match call {
            Call::Destroy(label) => Some(*label),
            _ => None,
        })
        .collect()
}
