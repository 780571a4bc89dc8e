use crate::util::map_error;
use embedded_graphics::{
    geometry::Point,
    pixelcolor::BinaryColor,
    prelude::DrawTarget,
    primitives::{Line, Primitive, PrimitiveStyle},
    Drawable,
};
use log::{trace, warn};
use std::fmt::Debug;
use u8g2_fonts::{
    fonts,
    types::{FontColor, VerticalPosition},
    FontRenderer,
};

/// Width of the OLED, in pixels
pub const SCREEN_WIDTH: i32 = 128;
/// Height of the OLED, in pixels
pub const SCREEN_HEIGHT: i32 = 64;

/// A drawing surface that shows whole frames. Nothing from a frame is visible
/// until [Screen::commit] returns.
pub trait Screen {
    /// Blank the screen immediately
    fn clear(&mut self) -> anyhow::Result<()>;

    /// Replace the screen contents with this frame
    fn commit(&mut self, frame: &Frame) -> anyhow::Result<()>;
}

/// Push a draw target's buffer out to the physical display
pub trait Flush {
    fn flush(&mut self) -> anyhow::Result<()>;
}

/// One screenful of draw calls, built up in memory and committed at once
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    items: Vec<DrawItem>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add text with its baseline starting at the given point
    pub fn text(
        &mut self,
        text: impl Into<String>,
        (x, y): (i32, i32),
        font_size: FontSize,
    ) -> &mut Self {
        self.items.push(DrawItem::Text(TextItem {
            text: text.into(),
            location: Point::new(x, y),
            font_size,
        }));
        self
    }

    /// Add a one-pixel horizontal line running right from the given point
    pub fn hline(&mut self, (x, y): (i32, i32), width: u32) -> &mut Self {
        self.items.push(DrawItem::HLine {
            start: Point::new(x, y),
            width,
        });
        self
    }

    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    /// All text in the frame, in draw order
    pub fn texts(&self) -> impl '_ + Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            DrawItem::Text(text_item) => Some(text_item.text.as_str()),
            DrawItem::HLine { .. } => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawItem {
    Text(TextItem),
    HLine { start: Point, width: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub location: Point,
    pub font_size: FontSize,
}

/// Proxy for font choice, because the u8g2 font types are zero-sized markers
/// that can't be stored in a frame
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FontSize {
    Small,
    Large,
}

/// [Screen] backed by any embedded-graphics monochrome target, e.g. the
/// buffered SSD1306 driver
pub struct GraphicsScreen<D> {
    target: D,
    /// The frame currently on the glass. `None` after a clear, so the next
    /// commit always draws.
    current: Option<Frame>,
    small: FontRenderer,
    large: FontRenderer,
}

impl<D> GraphicsScreen<D>
where
    D: DrawTarget<Color = BinaryColor> + Flush,
    D::Error: Debug,
{
    pub fn new(target: D) -> Self {
        Self {
            target,
            current: None,
            small: FontRenderer::new::<fonts::u8g2_font_timR08_tf>(),
            large: FontRenderer::new::<fonts::u8g2_font_timR10_tf>(),
        }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    fn draw_item(&mut self, item: &DrawItem) -> anyhow::Result<()> {
        match item {
            DrawItem::Text(text_item) => {
                let renderer = match text_item.font_size {
                    FontSize::Small => &self.small,
                    FontSize::Large => &self.large,
                };
                // One glyph at a time, because the renderer gives up on the
                // rest of a string at the first glyph it doesn't have
                let mut cursor = text_item.location;
                let mut buffer = [0; 4];
                for c in text_item.text.chars().map(latin1_fallback) {
                    let result = renderer.render(
                        &*c.encode_utf8(&mut buffer),
                        cursor,
                        VerticalPosition::Baseline,
                        FontColor::Transparent(BinaryColor::On),
                        &mut self.target,
                    );
                    match result {
                        Ok(dimensions) => cursor += dimensions.advance,
                        Err(u8g2_fonts::Error::GlyphNotFound(c)) => {
                            warn!(
                                "Font is missing glyph {c:?} in {:?}",
                                text_item.text
                            );
                        }
                        Err(err) => return Err(map_error(err)),
                    }
                }
            }
            DrawItem::HLine { start, width } => {
                let end = *start + Point::new(*width as i32 - 1, 0);
                Line::new(*start, end)
                    .into_styled(PrimitiveStyle::with_stroke(
                        BinaryColor::On,
                        1,
                    ))
                    .draw(&mut self.target)
                    .map_err(map_error)?;
            }
        }
        Ok(())
    }
}

/// The Times fonts only cover Latin-1. Hungarian's double-acute vowels are
/// outside it, so draw them with the nearest Latin-1 letter.
fn latin1_fallback(c: char) -> char {
    match c {
        'ő' => 'ö',
        'Ő' => 'Ö',
        'ű' => 'ü',
        'Ű' => 'Ü',
        _ => c,
    }
}

impl<D> Screen for GraphicsScreen<D>
where
    D: DrawTarget<Color = BinaryColor> + Flush,
    D::Error: Debug,
{
    fn clear(&mut self) -> anyhow::Result<()> {
        trace!("Clearing display");
        self.target.clear(BinaryColor::Off).map_err(map_error)?;
        self.target.flush()?;
        self.current = None;
        Ok(())
    }

    /// Draw the frame, unless it's identical to what's already showing. The
    /// settings screen is redrawn every loop iteration, so without this check
    /// the bus would never rest.
    fn commit(&mut self, frame: &Frame) -> anyhow::Result<()> {
        if self.current.as_ref() == Some(frame) {
            return Ok(());
        }
        trace!("Frame changed: old={:?}; new={frame:?}", self.current);

        self.target.clear(BinaryColor::Off).map_err(map_error)?;
        for item in frame.items() {
            self.draw_item(item)?;
        }
        trace!("Sending frame to display");
        self.target.flush()?;
        self.current = Some(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::{
        geometry::{OriginDimensions, Size},
        Pixel,
    };

    /// In-memory 128x64 target that counts flushes
    struct Canvas {
        pixels: [[bool; SCREEN_WIDTH as usize]; SCREEN_HEIGHT as usize],
        flushes: usize,
    }

    impl Canvas {
        fn new() -> Self {
            Self {
                pixels: [[false; SCREEN_WIDTH as usize];
                    SCREEN_HEIGHT as usize],
                flushes: 0,
            }
        }

        fn lit(&self) -> usize {
            self.pixels.iter().flatten().filter(|&&p| p).count()
        }
    }

    impl OriginDimensions for Canvas {
        fn size(&self) -> Size {
            Size::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32)
        }
    }

    impl DrawTarget for Canvas {
        type Color = BinaryColor;
        type Error = core::convert::Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                if (0..SCREEN_WIDTH).contains(&point.x)
                    && (0..SCREEN_HEIGHT).contains(&point.y)
                {
                    self.pixels[point.y as usize][point.x as usize] =
                        color.is_on();
                }
            }
            Ok(())
        }
    }

    impl Flush for Canvas {
        fn flush(&mut self) -> anyhow::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_hline() {
        let mut screen = GraphicsScreen::new(Canvas::new());
        let mut frame = Frame::new();
        frame.hline((0, 15), 127);
        screen.commit(&frame).unwrap();
        let canvas = screen.target();
        assert_eq!(canvas.lit(), 127);
        assert!(canvas.pixels[15][0]);
        assert!(canvas.pixels[15][126]);
        assert!(!canvas.pixels[15][127]);
    }

    #[test]
    fn test_unchanged_frame_skipped() {
        let mut screen = GraphicsScreen::new(Canvas::new());
        let mut frame = Frame::new();
        frame.text("Tétlen!", (0, 10), FontSize::Small);
        screen.commit(&frame).unwrap();
        assert!(screen.target().lit() > 0);
        screen.commit(&frame).unwrap();
        assert_eq!(screen.target().flushes, 1);

        // Clearing forgets the old frame, so it gets drawn again
        screen.clear().unwrap();
        assert_eq!(screen.target().lit(), 0);
        screen.commit(&frame).unwrap();
        assert_eq!(screen.target().flushes, 3);
    }

    /// Lit pixel count for one line of small text
    fn lit_text(text: &str) -> usize {
        let mut screen = GraphicsScreen::new(Canvas::new());
        let mut frame = Frame::new();
        frame.text(text, (0, 10), FontSize::Small);
        screen.commit(&frame).unwrap();
        screen.target().lit()
    }

    #[test]
    fn test_double_acute_drawn() {
        let full = lit_text("Ellenőrizze a beállításokat!");
        assert_eq!(full, lit_text("Ellenörizze a beállításokat!"));
        assert!(full > 2 * lit_text("Ellen"));
        assert_eq!(lit_text("erős felhőzet"), lit_text("erös felhözet"));
    }

    #[test]
    fn test_missing_glyph_skipped() {
        // The rest of the line still draws, shifted into the glyph's place
        assert_eq!(lit_text("10 € ár"), lit_text("10  ár"));
        assert!(lit_text("10 € ár") > lit_text("10 "));
    }

    #[test]
    fn test_frame_texts() {
        let mut frame = Frame::new();
        frame
            .hline((0, 53), 127)
            .text("a", (0, 10), FontSize::Small)
            .text("b", (32, 63), FontSize::Large);
        assert_eq!(frame.texts().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(frame.items().len(), 3);
    }
}
