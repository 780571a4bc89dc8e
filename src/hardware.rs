use anyhow::Context;
use display_interface::DisplayError;
use embedded_graphics::{
    geometry::{OriginDimensions, Size},
    pixelcolor::BinaryColor,
    prelude::DrawTarget,
    Pixel,
};
use linux_embedded_hal::{sysfs_gpio::Direction, I2cdev, SysfsPin};
use log::info;
use ssd1306::{
    mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306,
};
use weatherbox::{
    config::Config,
    display::{Flush, GraphicsScreen},
    util::map_error,
};

/// Everything attached to the Pi's header
pub struct Hardware {
    pub screen: GraphicsScreen<Oled>,
    pub settings_pin: SysfsPin,
    pub set_pin: SysfsPin,
}

impl Hardware {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let i2c = I2cdev::new(&config.i2c_port).with_context(|| {
            format!("Error opening I2C bus {}", config.i2c_port)
        })?;
        let mut display = Ssd1306::new(
            I2CDisplayInterface::new(i2c),
            DisplaySize128x64,
            DisplayRotation::Rotate0,
        )
        .into_buffered_graphics_mode();
        display.init().map_err(map_error).context("Display init")?;
        info!("Display controller initialized");

        let settings_pin = init_pin(config.settings_pin)
            .context("Initializing pin Settings")?;
        let set_pin =
            init_pin(config.set_pin).context("Initializing pin Set")?;

        Ok(Self {
            screen: GraphicsScreen::new(Oled(display)),
            settings_pin,
            set_pin,
        })
    }
}

/// Buffered 128x64 SSD1306 OLED on I2C. SH1106 panels are not supported:
/// their 132-column RAM lacks the addressing mode this driver flushes with.
pub struct Oled(
    Ssd1306<
        I2CInterface<I2cdev>,
        DisplaySize128x64,
        BufferedGraphicsMode<DisplaySize128x64>,
    >,
);

impl OriginDimensions for Oled {
    fn size(&self) -> Size {
        self.0.size()
    }
}

impl DrawTarget for Oled {
    type Color = BinaryColor;
    type Error = DisplayError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.0.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        DrawTarget::clear(&mut self.0, color)
    }
}

impl Flush for Oled {
    fn flush(&mut self) -> anyhow::Result<()> {
        self.0.flush().map_err(map_error)
    }
}

/// Initialize a GPIO pin as an input
fn init_pin(pin_num: u64) -> anyhow::Result<SysfsPin> {
    let pin = SysfsPin::new(pin_num);
    pin.export().context("Error exporting pin")?;
    while !pin.is_exported() {}
    pin.set_direction(Direction::In)
        .context("Error setting pin direction")?;
    Ok(pin)
}
