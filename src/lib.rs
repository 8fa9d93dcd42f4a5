//! promoshot-renderer: compositing engine for app-store marketing screenshots.
//!
//! This crate turns a declarative [`Scene`] — background, captured subject,
//! headline/subheadline text, overlay elements and popout crops — into
//! pixels, identically at every target size: the live preview, the adjacent
//! thumbnail previews, and full-resolution export renders all run the same
//! pipeline. Every spatial field is a percentage of the target surface, so
//! one Scene reproduces the same composition on all of them.
//!
//! # Example
//!
//! ```
//! use image::RgbaImage;
//! use promoshot_renderer::{
//!     ElementKind, FontStore, MemoryAssets, Scene, ZLayer, render_to_image,
//! };
//!
//! let mut assets = MemoryAssets::new();
//! let capture = assets.insert_image("shot", RgbaImage::new(640, 1280));
//!
//! let mut scene = Scene::with_subject(capture);
//! scene.subject.scale = 70.0;
//! scene.subject.y = 60.0;
//! scene.add_element(
//!     50.0,
//!     15.0,
//!     30.0,
//!     ZLayer::AboveSubject,
//!     ElementKind::Emoji { emoji: "🚀".to_string() },
//! );
//!
//! let fonts = FontStore::new();
//! let export = render_to_image(&scene, 645, 1398, &assets, &fonts);
//! assert_eq!((export.width(), export.height()), (645, 1398));
//! ```
//!
//! # Interaction
//!
//! Editing call sites hit-test and drag through [`hit_test`] and
//! [`apply_drag`], which reuse the exact placement math the compositor
//! paints with; popout crops are edited through [`resize_crop`] with its
//! eight handles and move mode.
//!
//! # External capabilities
//!
//! The engine never decodes images, discovers fonts, or talks to the
//! network. Callers supply an [`AssetProvider`] and a [`TextMeasurer`];
//! [`MemoryAssets`] and [`FontStore`] are the shipped in-process
//! implementations, and [`RasterSurface`] is the shipped [`Surface`] for
//! preview snapshots and export.

mod assets;
mod color;
mod interact;
pub mod render;
mod scene;
mod surface;
pub mod text;
mod transform;

pub use assets::{AssetError, AssetProvider, FontSpec, FontStore, MemoryAssets, TextMeasurer};
pub use color::Color;
pub use interact::{
    CropHandle, DragOutcome, Hit, SNAP_THRESHOLD, apply_drag, hit_test, resize_crop,
};
pub use render::{Renderer, render_to_image};
pub use scene::{
    AssetRef, Background, BackgroundKind, CropRect, ElementId, ElementKind, Frame, GradientStop,
    ImageFit, LayoutSettings, NoiseSettings, OverlayElement, Popout, Scene, Shadow, Subject,
    TextAnchor, TextBlock, TextFrame, TextFrameStyle, TextStyle, ZLayer,
};
pub use surface::{RasterSurface, Surface, TextBaseline, sample_stops};
pub use transform::{Mat2D, Rect};
